//! Per-item job records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::prompt::NormalizedItem;

/// Opaque identifier returned by the job backend for one in-flight task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobHandle(pub String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Launched and waiting on the backend
    #[default]
    Pending,
    /// Image generated and stored
    Success,
    /// Launch, remote job, or upload failed
    Fail,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Success => "success",
            JobState::Fail => "fail",
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Fail)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracking record for one input item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Position in the caller's input sequence
    pub origin_index: usize,
    /// Backend handle; `None` when the launch failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<JobHandle>,
    pub state: JobState,
    /// Public URL, set only on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    /// Failure reason, set only on fail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Target filename in the object store
    pub filename: String,
}

impl JobRecord {
    /// Record for an item whose job started.
    pub fn launched(item: &NormalizedItem, handle: JobHandle) -> Self {
        Self {
            origin_index: item.origin_index,
            handle: Some(handle),
            state: JobState::Pending,
            output_url: None,
            error: None,
            filename: item.filename.clone(),
        }
    }

    /// Record for an item whose job could not be started.
    pub fn launch_failed(item: &NormalizedItem, error: impl Into<String>) -> Self {
        Self {
            origin_index: item.origin_index,
            handle: None,
            state: JobState::Fail,
            output_url: None,
            error: Some(error.into()),
            filename: item.filename.clone(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == JobState::Pending
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to `Success`. Returns false if the record was already terminal.
    pub fn succeed(&mut self, url: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.state = JobState::Success;
        self.output_url = Some(url.into());
        true
    }

    /// Move to `Fail`. Returns false if the record was already terminal.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.state = JobState::Fail;
        self.error = Some(error.into());
        true
    }
}
