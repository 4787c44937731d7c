//! The `StaticController` trait.

use cl_core::{Real, Vector, ensure_len};

use crate::error::{ControlError, ControlResult};

/// Dimensions and default reference of a controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerInfo {
    pub name: String,
    k: usize,
    m: usize,
    p: usize,
    /// Default constant reference (length k).
    pub rbar: Vector,
}

impl ControllerInfo {
    /// Create a description with reference dimension `k`, output
    /// (control input) dimension `m` and sensor dimension `p`.
    pub fn new(k: usize, m: usize, p: usize) -> ControlResult<Self> {
        if k == 0 || m == 0 || p == 0 {
            return Err(ControlError::InvalidArg {
                what: "controller dimensions must be at least 1",
            });
        }
        Ok(Self {
            name: "StaticController".to_string(),
            k,
            m,
            p,
            rbar: Vector::zeros(k),
        })
    }

    pub fn k(&self) -> usize {
        self.k
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

    pub fn with_rbar(mut self, rbar: Vector) -> ControlResult<Self> {
        ensure_len(&rbar, self.k, "rbar")?;
        self.rbar = rbar;
        Ok(self)
    }
}

/// Memoryless feedback law `u = c(y, r, t)`.
///
/// Implementors provide [`info`](Self::info) and [`c`](Self::c). The law
/// must be a pure function of its arguments: the same `(y, r, t)` always
/// produces the same `u`.
pub trait StaticController {
    fn info(&self) -> &ControllerInfo;

    /// Feedback computation.
    ///
    /// # Arguments
    ///
    /// * `y` - Sensor signal (length p)
    /// * `r` - Reference signal (length k)
    /// * `t` - Time
    ///
    /// # Returns
    ///
    /// Control input (length m).
    fn c(&self, y: &Vector, r: &Vector, t: Real) -> ControlResult<Vector>;

    /// Feedback with the default reference: `c(y, rbar, t)`.
    fn cbar(&self, y: &Vector, t: Real) -> ControlResult<Vector> {
        self.c(y, &self.info().rbar, t)
    }

    /// Reference signal used in closed-loop simulation (default `rbar`).
    fn t2r(&self, _t: Real) -> ControlResult<Vector> {
        Ok(self.info().rbar.clone())
    }

    fn k(&self) -> usize {
        self.info().k()
    }

    fn m(&self) -> usize {
        self.info().m()
    }

    fn p(&self) -> usize {
        self.info().p()
    }
}
