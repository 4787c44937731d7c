//! Time-stepping simulation of continuous-time dynamical systems.
//!
//! Provides:
//! - Fixed-step explicit Euler integration over a uniform grid
//! - Adaptive Dormand-Prince 5(4) integration sampled on the same grid
//! - Input signals: closures of time, constants, or the system's own `t2u`
//! - Assembly of a consistent [`Trajectory`](cl_results::Trajectory)
//!   (states, inputs, outputs, derivatives)

pub mod error;
pub mod input;
pub mod ode;
pub mod sim;

pub use error::{SimError, SimResult};
pub use input::{ConstantInput, InputSignal, SystemInput};
pub use ode::{DormandPrince, OdeOptions, SolverStats};
pub use sim::{SimOptions, Simulator, SolverMethod, simulate};
