//! Orchestration error types.
//!
//! Per-item failures never surface here; they are recorded on the item's
//! `JobRecord`. These errors abort a whole request.

use thiserror::Error;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("No prompts to generate")]
    EmptyRequest,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl OrchestratorError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
