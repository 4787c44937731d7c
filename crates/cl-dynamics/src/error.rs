//! Error types for system evaluation.

use cl_core::CoreError;
use thiserror::Error;

pub type DynResult<T> = Result<T, DynamicsError>;

/// Errors raised while building or evaluating a dynamical system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DynamicsError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Evaluation failed: {message}")]
    Evaluation { message: String },
}

impl From<CoreError> for DynamicsError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::DimensionMismatch {
                what,
                expected,
                got,
            } => DynamicsError::DimensionMismatch {
                what,
                expected,
                got,
            },
            CoreError::InvalidArg { what } => DynamicsError::InvalidArg { what },
        }
    }
}
