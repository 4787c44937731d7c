//! Continuous-time dynamical system contract for clsim.
//!
//! A system is described by:
//! - an evolution law `dx = f(x, u, t)` (required)
//! - an output law `y = h(x, u, t)` (identity by default)
//! - an open-loop input law `u = t2u(t)` (constant `ubar` by default)
//! - state and input domains used by validity predicates
//!
//! The [`SystemInfo`] value carries dimensions, bounds, operating point
//! and cosmetic labels; concrete systems hold one and expose it through
//! [`DynamicalSystem::info`].

pub mod error;
pub mod info;
pub mod linear;
pub mod system;

pub use error::{DynResult, DynamicsError};
pub use info::{Labels, OperatingPoint, StateDomain, SystemInfo};
pub use linear::LinearSystem;
pub use system::DynamicalSystem;
