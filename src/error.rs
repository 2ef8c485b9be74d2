use flight_replay_core::mission::PlanError;

/// Errors that can occur during a replay run.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("No usable position records in {0}")]
    EmptyLog(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Link error: {0}")]
    Link(String),

    #[error("Timeout waiting for {0}")]
    Timeout(&'static str),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Mission plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
