//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to configure storage client: {0}")]
    ConfigError(String),

    #[error("Invalid image payload: {0}")]
    Decode(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("No public URL for {key}: {reason}")]
    PublicUrl { key: String, reason: String },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("AWS SDK error: {0}")]
    AwsSdk(String),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn public_url(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PublicUrl {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
