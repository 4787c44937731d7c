use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid scenario: {message}")]
    Scenario { message: String },

    #[error(transparent)]
    Dynamics(#[from] cl_dynamics::DynamicsError),

    #[error(transparent)]
    Control(#[from] cl_controls::ControlError),

    #[error(transparent)]
    Sim(#[from] cl_sim::SimError),

    #[error(transparent)]
    Results(#[from] cl_results::ResultsError),
}

impl CliError {
    pub fn scenario(message: impl Into<String>) -> Self {
        CliError::Scenario {
            message: message.into(),
        }
    }
}
