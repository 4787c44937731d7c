//! Memoryless feedback controllers and closed-loop composition.
//!
//! # Architecture
//!
//! - [`StaticController`]: feedback law `u = c(y, r, t)` with no internal state
//! - [`LinearFeedback`]: gain-matrix controller with optional saturation
//! - [`ClosedLoopSystem`]: a plant and a controller composed into a single
//!   [`DynamicalSystem`](cl_dynamics::DynamicalSystem) whose input is the
//!   controller reference
//!
//! Signal naming:
//! - `r`: reference, length k
//! - `y`: sensor reading, length p
//! - `u`: control input, length m

pub mod closed_loop;
pub mod controller;
pub mod error;
pub mod linear;

pub use closed_loop::ClosedLoopSystem;
pub use controller::{ControllerInfo, StaticController};
pub use error::{ControlError, ControlResult};
pub use linear::LinearFeedback;
