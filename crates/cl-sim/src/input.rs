//! Time-indexed input signals `u(t)`.

use cl_core::{Real, Vector};
use cl_dynamics::DynamicalSystem;

use crate::error::SimResult;

/// Source of the input vector applied at time `t`.
///
/// Closures `Fn(Real) -> Vector` implement this directly.
pub trait InputSignal {
    fn u(&self, t: Real) -> SimResult<Vector>;
}

impl<F> InputSignal for F
where
    F: Fn(Real) -> Vector,
{
    fn u(&self, t: Real) -> SimResult<Vector> {
        Ok(self(t))
    }
}

/// Same input at every time.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantInput(pub Vector);

impl InputSignal for ConstantInput {
    fn u(&self, _t: Real) -> SimResult<Vector> {
        Ok(self.0.clone())
    }
}

/// The system's own open-loop input law `t2u`.
#[derive(Debug)]
pub struct SystemInput<'a, S: ?Sized> {
    system: &'a S,
}

impl<'a, S: DynamicalSystem + ?Sized> SystemInput<'a, S> {
    pub fn new(system: &'a S) -> Self {
        Self { system }
    }
}

impl<S: DynamicalSystem + ?Sized> InputSignal for SystemInput<'_, S> {
    fn u(&self, t: Real) -> SimResult<Vector> {
        Ok(self.system.t2u(t)?)
    }
}
