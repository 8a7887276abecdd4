use thiserror::Error;

#[derive(Debug, Error)]
pub enum PulseError {
    #[error("not configured: create {0} or pass --config")]
    NotConfigured(String),

    #[error("invalid time format '{0}': expected now, yesterday, last week, <N>[dhmw], RFC3339, YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS")]
    InvalidTimeFormat(String),

    #[error("invalid time window: from ({from}) is after to ({to})")]
    InvalidWindow { from: String, to: String },

    #[error("pipeline not found: {0}")]
    PipelineNotFound(String),

    #[error("repository not found: {0}")]
    RepoNotFound(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: missing {0}")]
    MissingData(String),

    #[error("background task failed: {0}")]
    Task(String),

    #[error("missing API token: set the {0} environment variable")]
    MissingToken(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PulseError {
    /// Errors caused by bad command-line input rather than backend state.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            PulseError::InvalidTimeFormat(_) | PulseError::InvalidWindow { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PulseError>;
