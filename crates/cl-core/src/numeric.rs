use nalgebra::{DMatrix, DVector};

use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

/// Dynamically sized column vector (states, inputs, outputs, references).
pub type Vector = DVector<Real>;

/// Row-per-sample signal storage.
pub type Matrix = DMatrix<Real>;

/// Check that a vector has the expected length.
pub fn ensure_len(v: &Vector, expected: usize, what: &'static str) -> Result<(), CoreError> {
    if v.len() == expected {
        Ok(())
    } else {
        Err(CoreError::DimensionMismatch {
            what,
            expected,
            got: v.len(),
        })
    }
}
