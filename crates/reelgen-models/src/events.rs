//! Wire types sent to the presentation layer.
//!
//! Streaming responses carry [`StreamEvent`]s as server-sent events; the
//! non-streaming path answers with a single [`GenerateImagesResponse`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::progress::{AggregateResult, ProgressSnapshot};

/// Event kinds on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventType {
    Progress,
    Complete,
    Error,
}

impl StreamEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamEventType::Progress => "progress",
            StreamEventType::Complete => "complete",
            StreamEventType::Error => "error",
        }
    }
}

/// Server-sent event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Progress update
    Progress {
        completed: usize,
        total: usize,
        message: String,
    },

    /// Final aggregate; always the last event of a successful run
    Complete {
        success: bool,
        images: Vec<String>,
        /// Number of images generated
        total: usize,
        failed: usize,
    },

    /// Orchestration-level failure; always the last event
    Error { error: String },
}

impl StreamEvent {
    pub fn progress(snapshot: &ProgressSnapshot) -> Self {
        StreamEvent::Progress {
            completed: snapshot.completed,
            total: snapshot.total,
            message: snapshot.message.clone(),
        }
    }

    pub fn complete(result: &AggregateResult) -> Self {
        StreamEvent::Complete {
            success: true,
            images: result.images.clone(),
            total: result.succeeded,
            failed: result.failed,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        StreamEvent::Error {
            error: error.into(),
        }
    }

    pub fn event_type(&self) -> StreamEventType {
        match self {
            StreamEvent::Progress { .. } => StreamEventType::Progress,
            StreamEvent::Complete { .. } => StreamEventType::Complete,
            StreamEvent::Error { .. } => StreamEventType::Error,
        }
    }

    /// Terminal events close the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Progress { .. })
    }
}

/// Non-streaming success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerateImagesResponse {
    pub success: bool,
    pub images: Vec<String>,
}

impl From<AggregateResult> for GenerateImagesResponse {
    fn from(result: AggregateResult) -> Self {
        Self {
            success: true,
            images: result.images,
        }
    }
}
