//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered during a simulation run.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Integration failed at t = {t}: {what}")]
    Integration { what: &'static str, t: f64 },

    #[error("System evaluation failed: {0}")]
    Dynamics(#[from] cl_dynamics::DynamicsError),

    #[error("Trajectory assembly failed: {0}")]
    Results(#[from] cl_results::ResultsError),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<cl_core::CoreError> for SimError {
    fn from(e: cl_core::CoreError) -> Self {
        match e {
            cl_core::CoreError::DimensionMismatch {
                what,
                expected,
                got,
            } => SimError::DimensionMismatch {
                what,
                expected,
                got,
            },
            cl_core::CoreError::InvalidArg { what } => SimError::InvalidArg { what },
        }
    }
}
