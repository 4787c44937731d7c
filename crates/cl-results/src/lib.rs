//! cl-results: simulation trajectories and their persistence.

pub mod archive;
pub mod csv;
pub mod summary;
pub mod trajectory;

pub use archive::{ARCHIVE_FORMAT, ARCHIVE_VERSION, DEFAULT_ARCHIVE_NAME};
pub use csv::{Signal, write_csv, write_csv_file, write_signal_csv};
pub use summary::TrajectorySummary;
pub use trajectory::Trajectory;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Inconsistent signal {signal}: expected {expected} samples, got {got}")]
    Inconsistent {
        signal: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid time grid: {what}")]
    InvalidTime { what: &'static str },

    #[error("Time {t} is beyond final time {time_final}")]
    OutOfRange { t: f64, time_final: f64 },

    #[error("Unrecognized archive: {message}")]
    Format { message: String },
}
