//! Simulation runner and trajectory assembly.

use std::fmt;
use std::str::FromStr;

use cl_core::{Matrix, Real, Vector, ensure_len, linspace, step_size};
use cl_dynamics::DynamicalSystem;
use cl_results::Trajectory;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::input::{InputSignal, SystemInput};
use crate::ode::{DormandPrince, OdeOptions};

/// Integration method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverMethod {
    /// Adaptive Dormand-Prince 5(4), sampled on the grid (default).
    #[default]
    Ode,
    /// Explicit forward Euler with the grid spacing as step.
    Euler,
}

impl fmt::Display for SolverMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverMethod::Ode => f.write_str("ode"),
            SolverMethod::Euler => f.write_str("euler"),
        }
    }
}

impl FromStr for SolverMethod {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ode" => Ok(SolverMethod::Ode),
            "euler" => Ok(SolverMethod::Euler),
            _ => Err(SimError::InvalidArg {
                what: "solver method must be 'ode' or 'euler'",
            }),
        }
    }
}

/// Options for simulation runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Final time (seconds); the grid starts at 0
    pub tf: Real,
    /// Number of samples, including both endpoints
    pub n: usize,
    /// Integration method
    pub method: SolverMethod,
    /// Initial state; the system's `x0` when `None`
    pub x0: Option<Vector>,
    /// Adaptive solver settings (ODE method only)
    pub ode: OdeOptions,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            tf: 10.0,
            n: 10001,
            method: SolverMethod::default(),
            x0: None,
            ode: OdeOptions::default(),
        }
    }
}

impl SimOptions {
    pub fn new(tf: Real, n: usize, method: SolverMethod) -> Self {
        Self {
            tf,
            n,
            method,
            ..Self::default()
        }
    }

    pub fn with_x0(mut self, x0: Vector) -> Self {
        self.x0 = Some(x0);
        self
    }
}

/// Open-loop simulator for a [`DynamicalSystem`] driven by an [`InputSignal`].
///
/// For closed-loop runs, compose the plant and controller first (the
/// composed system is itself a `DynamicalSystem`) and drive it with its own
/// input law through [`SystemInput`].
pub struct Simulator<'a, S: ?Sized, U> {
    system: &'a S,
    input: U,
    tf: Real,
    n: usize,
    method: SolverMethod,
    x0: Vector,
    ode: OdeOptions,
}

impl<'a, S, U> Simulator<'a, S, U>
where
    S: DynamicalSystem + ?Sized,
    U: InputSignal,
{
    /// Validate the options against the system.
    ///
    /// Fails if `n < 2`, if `tf` is not a positive finite number, or if the
    /// initial state length differs from the system's state dimension.
    pub fn new(system: &'a S, input: U, options: SimOptions) -> SimResult<Self> {
        if options.n < 2 {
            return Err(SimError::InvalidArg {
                what: "number of samples must be at least 2",
            });
        }
        if !(options.tf > 0.0 && options.tf.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "final time must be positive and finite",
            });
        }
        let x0 = options
            .x0
            .unwrap_or_else(|| system.info().operating_point.x0.clone());
        ensure_len(&x0, system.n(), "initial state")?;

        Ok(Self {
            system,
            input,
            tf: options.tf,
            n: options.n,
            method: options.method,
            x0,
            ode: options.ode,
        })
    }

    /// Grid spacing `tf / (n - 1)`.
    pub fn dt(&self) -> Real {
        step_size(0.0, self.tf, self.n)
    }

    pub fn method(&self) -> SolverMethod {
        self.method
    }

    /// Integrate through time and assemble the trajectory.
    ///
    /// No partial result is returned: any evaluation or solver failure
    /// aborts the run.
    pub fn compute(&self) -> SimResult<Trajectory> {
        let t = linspace(0.0, self.tf, self.n)?;
        debug!(
            system = %self.system.info().name,
            method = %self.method,
            samples = self.n,
            tf = self.tf,
            "simulation started"
        );

        let traj = match self.method {
            SolverMethod::Euler => self.compute_euler(t)?,
            SolverMethod::Ode => self.compute_ode(t)?,
        };

        debug!(samples = traj.time_steps(), "simulation finished");
        Ok(traj)
    }

    fn compute_euler(&self, t: Vec<Real>) -> SimResult<Trajectory> {
        let dt = self.dt();
        let mut rec = Recorder::new(self.n, self.system);

        let mut xi = self.x0.clone();
        for (i, &ti) in t.iter().enumerate() {
            let ui = self.input_at(ti)?;
            let dxi = self.derivative(&xi, &ui, ti)?;
            let yi = self.output(&xi, &ui, ti)?;
            rec.push(i, &xi, &ui, &dxi, &yi);

            if i + 1 < self.n {
                xi += &dxi * dt;
            }
        }

        rec.finish(t)
    }

    fn compute_ode(&self, t: Vec<Real>) -> SimResult<Trajectory> {
        // Phase 1: states only. The solver evaluates f at its own points.
        let mut solver = DormandPrince::new(self.ode);
        let states = solver.solve(
            |ti, xi| {
                let ui = self.input_at(ti)?;
                self.derivative(xi, &ui, ti)
            },
            &t,
            &self.x0,
        )?;
        let stats = solver.stats();
        debug!(
            accepted = stats.accepted,
            rejected = stats.rejected,
            evals = stats.evals,
            implicit = stats.implicit_steps,
            "ode solve finished"
        );

        // Phase 2: inputs, derivatives and outputs on the sampling grid.
        let mut rec = Recorder::new(self.n, self.system);
        for (i, (&ti, xi)) in t.iter().zip(states.iter()).enumerate() {
            let ui = self.input_at(ti)?;
            let dxi = self.derivative(xi, &ui, ti)?;
            let yi = self.output(xi, &ui, ti)?;
            rec.push(i, xi, &ui, &dxi, &yi);
        }

        rec.finish(t)
    }

    fn input_at(&self, t: Real) -> SimResult<Vector> {
        let u = self.input.u(t)?;
        ensure_len(&u, self.system.m(), "input")?;
        Ok(u)
    }

    fn derivative(&self, x: &Vector, u: &Vector, t: Real) -> SimResult<Vector> {
        let dx = self.system.f(x, u, t)?;
        ensure_len(&dx, self.system.n(), "state derivative")?;
        Ok(dx)
    }

    fn output(&self, x: &Vector, u: &Vector, t: Real) -> SimResult<Vector> {
        let y = self.system.h(x, u, t)?;
        ensure_len(&y, self.system.p(), "output")?;
        Ok(y)
    }
}

/// Row-per-sample buffers owned by one run.
struct Recorder {
    x: Matrix,
    u: Matrix,
    dx: Matrix,
    y: Matrix,
}

impl Recorder {
    fn new<S: DynamicalSystem + ?Sized>(samples: usize, system: &S) -> Self {
        Self {
            x: Matrix::zeros(samples, system.n()),
            u: Matrix::zeros(samples, system.m()),
            dx: Matrix::zeros(samples, system.n()),
            y: Matrix::zeros(samples, system.p()),
        }
    }

    fn push(&mut self, i: usize, x: &Vector, u: &Vector, dx: &Vector, y: &Vector) {
        self.x.set_row(i, &x.transpose());
        self.u.set_row(i, &u.transpose());
        self.dx.set_row(i, &dx.transpose());
        self.y.set_row(i, &y.transpose());
    }

    fn finish(self, t: Vec<Real>) -> SimResult<Trajectory> {
        Ok(Trajectory::new(self.x, self.u, t, self.dx, self.y)?)
    }
}

/// Simulate a system under its own open-loop input law `t2u`.
pub fn simulate<S>(system: &S, options: SimOptions) -> SimResult<Trajectory>
where
    S: DynamicalSystem + ?Sized,
{
    Simulator::new(system, SystemInput::new(system), options)?.compute()
}
