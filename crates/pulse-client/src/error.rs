use pulse_core::PulseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{backend} returned HTTP {status}: {body}")]
    Status {
        backend: String,
        status: u16,
        body: String,
    },

    #[error("{backend} query failed: {}", .messages.join("; "))]
    GraphQl {
        backend: String,
        messages: Vec<String>,
    },

    #[error("{0} response had no data")]
    MissingData(String),
}

impl From<ClientError> for PulseError {
    fn from(e: ClientError) -> Self {
        PulseError::Transport(e.to_string())
    }
}
