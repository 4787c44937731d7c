//! The `DynamicalSystem` trait.

use cl_core::{Real, Vector};

use crate::error::{DynResult, DynamicsError};
use crate::info::SystemInfo;

/// Continuous-time dynamical system `dx = f(x, u, t)`, `y = h(x, u, t)`.
///
/// Implementors must provide [`info`](Self::info) and [`f`](Self::f).
/// Everything else has a default:
/// - `h` returns the full state (requires `p == n`)
/// - `t2u` returns the constant nominal input `ubar`
/// - `isavalidstate` / `isavalidinput` check the box domain in [`SystemInfo`]
///
/// All evaluations must be pure functions of their arguments. The simulator
/// calls them many times per sample and in no particular order.
pub trait DynamicalSystem {
    /// Dimensions, domain, operating point and labels.
    fn info(&self) -> &SystemInfo;

    /// State derivative `dx = f(x, u, t)` (length n).
    fn f(&self, x: &Vector, u: &Vector, t: Real) -> DynResult<Vector>;

    /// Output `y = h(x, u, t)` (length p).
    fn h(&self, x: &Vector, _u: &Vector, _t: Real) -> DynResult<Vector> {
        Ok(x.clone())
    }

    /// Open-loop input signal `u = t2u(t)` (length m).
    fn t2u(&self, _t: Real) -> DynResult<Vector> {
        Ok(self.info().operating_point.ubar.clone())
    }

    fn n(&self) -> usize {
        self.info().n()
    }

    fn m(&self) -> usize {
        self.info().m()
    }

    fn p(&self) -> usize {
        self.info().p()
    }

    /// True iff every state component is within `[x_lb, x_ub]`.
    fn isavalidstate(&self, x: &Vector) -> bool {
        self.info().domain.contains_state(x)
    }

    /// True iff every input component is within `[u_lb, u_ub]`.
    fn isavalidinput(&self, _x: &Vector, u: &Vector) -> bool {
        self.info().domain.contains_input(u)
    }

    /// Derivative under the system's own open-loop input: `f(x, t2u(t), t)`.
    fn fsim(&self, x: &Vector, t: Real) -> DynResult<Vector> {
        let u = self.t2u(t)?;
        self.f(x, &u, t)
    }

    /// Discrete-time rollout: `steps` forward-Euler steps of size `dt`
    /// under a held input `u`, starting at time `t`.
    fn x_next(&self, x: &Vector, u: &Vector, t: Real, dt: Real, steps: usize) -> DynResult<Vector> {
        if !dt.is_finite() {
            return Err(DynamicsError::InvalidArg {
                what: "dt must be finite",
            });
        }
        let mut x_k = x.clone();
        for k in 0..steps {
            let dx = self.f(&x_k, u, t + k as Real * dt)?;
            x_k += dx * dt;
        }
        Ok(x_k)
    }

    /// Configuration variables used by kinematic projections (default `q = x`).
    fn xut2q(&self, x: &Vector, _u: &Vector, _t: Real) -> DynResult<Vector> {
        Ok(x.clone())
    }
}
