//! cl-core: shared foundation for clsim.
//!
//! Contains:
//! - numeric (Real, Vector/Matrix aliases, length checks)
//! - grid (uniform time grids, nearest-sample lookup)
//! - error (shared error types)

pub mod error;
pub mod grid;
pub mod numeric;

pub use error::{CoreError, CoreResult};
pub use grid::*;
pub use numeric::*;
