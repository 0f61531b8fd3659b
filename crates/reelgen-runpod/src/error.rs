//! Job backend error types.

use thiserror::Error;

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Job backend not configured: {0}")]
    Config(String),

    #[error("Backend returned {status}: {body}")]
    Launch { status: u16, body: String },

    #[error("Backend response did not include a job id")]
    MissingHandle,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl BackendError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether a status check that failed this way may succeed on a later poll.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Network(_) | BackendError::RequestFailed(_) => true,
            BackendError::Launch { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
