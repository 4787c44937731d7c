//! Error types for control system operations.

use cl_core::CoreError;
use cl_dynamics::DynamicsError;
use cl_results::ResultsError;
use cl_sim::SimError;
use thiserror::Error;

/// Result type for control system operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur in control system operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Controller and plant disagree on a signal dimension.
    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Plant evaluation failed inside a closed loop.
    #[error("Plant error: {0}")]
    Plant(#[from] DynamicsError),

    /// Rebuilding a trajectory failed.
    #[error("Trajectory error: {0}")]
    Trajectory(#[from] ResultsError),

    /// Closed-loop simulation failed.
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),
}

impl From<CoreError> for ControlError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::DimensionMismatch {
                what,
                expected,
                got,
            } => ControlError::DimensionMismatch {
                what,
                expected,
                got,
            },
            CoreError::InvalidArg { what } => ControlError::InvalidArg { what },
        }
    }
}

impl From<ControlError> for DynamicsError {
    fn from(e: ControlError) -> Self {
        match e {
            ControlError::Plant(inner) | ControlError::Simulation(SimError::Dynamics(inner)) => inner,
            other => DynamicsError::Evaluation {
                message: other.to_string(),
            },
        }
    }
}
