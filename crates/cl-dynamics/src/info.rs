//! Dimensions, domains, operating point and labels of a system.

use cl_core::{Vector, ensure_len};

use crate::error::{DynResult, DynamicsError};

/// Default half-width of the state domain.
pub const DEFAULT_STATE_BOUND: f64 = 10.0;

/// Default half-width of the input domain.
pub const DEFAULT_INPUT_BOUND: f64 = 1.0;

/// Box domain over states and inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct StateDomain {
    /// State lower bounds (length n)
    pub x_lb: Vector,
    /// State upper bounds (length n)
    pub x_ub: Vector,
    /// Input lower bounds (length m)
    pub u_lb: Vector,
    /// Input upper bounds (length m)
    pub u_ub: Vector,
}

impl StateDomain {
    fn symmetric(n: usize, m: usize) -> Self {
        Self {
            x_lb: Vector::from_element(n, -DEFAULT_STATE_BOUND),
            x_ub: Vector::from_element(n, DEFAULT_STATE_BOUND),
            u_lb: Vector::from_element(m, -DEFAULT_INPUT_BOUND),
            u_ub: Vector::from_element(m, DEFAULT_INPUT_BOUND),
        }
    }

    /// Valid iff every state component lies within its bounds.
    pub fn contains_state(&self, x: &Vector) -> bool {
        within(x, &self.x_lb, &self.x_ub)
    }

    /// Valid iff every input component lies within its bounds.
    pub fn contains_input(&self, u: &Vector) -> bool {
        within(u, &self.u_lb, &self.u_ub)
    }
}

fn within(v: &Vector, lb: &Vector, ub: &Vector) -> bool {
    v.len() == lb.len()
        && v
            .iter()
            .zip(lb.iter().zip(ub.iter()))
            .all(|(value, (lo, hi))| value >= lo && value <= hi)
}

/// Nominal operating point and default initial condition.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatingPoint {
    /// Nominal state (length n)
    pub xbar: Vector,
    /// Nominal input (length m), also the default open-loop input
    pub ubar: Vector,
    /// Default initial state for simulations (length n)
    pub x0: Vector,
}

/// Cosmetic names and units for each signal component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Labels {
    pub state: Vec<String>,
    pub input: Vec<String>,
    pub output: Vec<String>,
    pub state_units: Vec<String>,
    pub input_units: Vec<String>,
    pub output_units: Vec<String>,
}

impl Labels {
    fn numbered(n: usize, m: usize, p: usize) -> Self {
        Self {
            state: (0..n).map(|i| format!("State {i}")).collect(),
            input: (0..m).map(|i| format!("Input {i}")).collect(),
            output: (0..p).map(|i| format!("Output {i}")).collect(),
            state_units: vec![String::new(); n],
            input_units: vec![String::new(); m],
            output_units: vec![String::new(); p],
        }
    }
}

/// Static description of a dynamical system.
///
/// Dimensions are fixed at construction. Bounds, operating point and labels
/// may be replaced through the `with_*` setters before simulation; every
/// setter checks vector lengths against the dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemInfo {
    pub name: String,
    n: usize,
    m: usize,
    p: usize,
    pub domain: StateDomain,
    pub operating_point: OperatingPoint,
    pub labels: Labels,
}

impl SystemInfo {
    /// Create a description with `n` states, `m` inputs and `p` outputs.
    ///
    /// `n` and `p` must be at least 1. `m = 0` describes an input-free
    /// system (pure drift).
    pub fn new(n: usize, m: usize, p: usize) -> DynResult<Self> {
        if n == 0 {
            return Err(DynamicsError::InvalidArg {
                what: "state dimension must be at least 1",
            });
        }
        if p == 0 {
            return Err(DynamicsError::InvalidArg {
                what: "output dimension must be at least 1",
            });
        }
        Ok(Self {
            name: "ContinuousDynamicSystem".to_string(),
            n,
            m,
            p,
            domain: StateDomain::symmetric(n, m),
            operating_point: OperatingPoint {
                xbar: Vector::zeros(n),
                ubar: Vector::zeros(m),
                x0: Vector::zeros(n),
            },
            labels: Labels::numbered(n, m, p),
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn p(&self) -> usize {
        self.p
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_state_bounds(mut self, x_lb: Vector, x_ub: Vector) -> DynResult<Self> {
        ensure_len(&x_lb, self.n, "x_lb")?;
        ensure_len(&x_ub, self.n, "x_ub")?;
        ensure_ordered(&x_lb, &x_ub)?;
        self.domain.x_lb = x_lb;
        self.domain.x_ub = x_ub;
        Ok(self)
    }

    pub fn with_input_bounds(mut self, u_lb: Vector, u_ub: Vector) -> DynResult<Self> {
        ensure_len(&u_lb, self.m, "u_lb")?;
        ensure_len(&u_ub, self.m, "u_ub")?;
        ensure_ordered(&u_lb, &u_ub)?;
        self.domain.u_lb = u_lb;
        self.domain.u_ub = u_ub;
        Ok(self)
    }

    pub fn with_operating_point(mut self, xbar: Vector, ubar: Vector) -> DynResult<Self> {
        ensure_len(&xbar, self.n, "xbar")?;
        ensure_len(&ubar, self.m, "ubar")?;
        self.operating_point.xbar = xbar;
        self.operating_point.ubar = ubar;
        Ok(self)
    }

    pub fn with_x0(mut self, x0: Vector) -> DynResult<Self> {
        ensure_len(&x0, self.n, "x0")?;
        self.operating_point.x0 = x0;
        Ok(self)
    }

    pub fn with_state_labels(mut self, labels: Vec<String>, units: Vec<String>) -> DynResult<Self> {
        ensure_count(&labels, self.n, "state labels")?;
        ensure_count(&units, self.n, "state units")?;
        self.labels.state = labels;
        self.labels.state_units = units;
        Ok(self)
    }

    pub fn with_input_labels(mut self, labels: Vec<String>, units: Vec<String>) -> DynResult<Self> {
        ensure_count(&labels, self.m, "input labels")?;
        ensure_count(&units, self.m, "input units")?;
        self.labels.input = labels;
        self.labels.input_units = units;
        Ok(self)
    }

    pub fn with_output_labels(
        mut self,
        labels: Vec<String>,
        units: Vec<String>,
    ) -> DynResult<Self> {
        ensure_count(&labels, self.p, "output labels")?;
        ensure_count(&units, self.p, "output units")?;
        self.labels.output = labels;
        self.labels.output_units = units;
        Ok(self)
    }

    /// Check a state argument length.
    pub fn check_state(&self, x: &Vector) -> DynResult<()> {
        Ok(ensure_len(x, self.n, "state")?)
    }

    /// Check an input argument length.
    pub fn check_input(&self, u: &Vector) -> DynResult<()> {
        Ok(ensure_len(u, self.m, "input")?)
    }

    /// Check an output value length.
    pub fn check_output(&self, y: &Vector) -> DynResult<()> {
        Ok(ensure_len(y, self.p, "output")?)
    }
}

fn ensure_ordered(lb: &Vector, ub: &Vector) -> DynResult<()> {
    if lb.iter().zip(ub.iter()).all(|(lo, hi)| lo <= hi) {
        Ok(())
    } else {
        Err(DynamicsError::InvalidArg {
            what: "lower bound exceeds upper bound",
        })
    }
}

fn ensure_count(items: &[String], expected: usize, what: &'static str) -> DynResult<()> {
    if items.len() == expected {
        Ok(())
    } else {
        Err(DynamicsError::DimensionMismatch {
            what,
            expected,
            got: items.len(),
        })
    }
}
