//! Job backend request/response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use reelgen_models::{AspectRatio, QualityTier};

/// One generation job to start.
#[derive(Debug, Clone, PartialEq)]
pub struct StartJob {
    pub prompt: String,
    pub quality: QualityTier,
    pub aspect_ratio: AspectRatio,
}

/// `POST /run` body.
#[derive(Debug, Serialize)]
pub(crate) struct RunRequest<'a> {
    pub input: RunInput<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RunInput<'a> {
    pub prompt: &'a str,
    pub quality: QualityTier,
    pub aspect_ratio: String,
}

impl<'a> From<&'a StartJob> for RunRequest<'a> {
    fn from(job: &'a StartJob) -> Self {
        Self {
            input: RunInput {
                prompt: &job.prompt,
                quality: job.quality,
                aspect_ratio: job.aspect_ratio.to_string(),
            },
        }
    }
}

/// `POST /run` response.
#[derive(Debug, Deserialize)]
pub(crate) struct RunResponse {
    #[serde(default)]
    pub id: Option<String>,
}

/// Remote job status as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteStatus {
    InQueue,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
    /// Any status this client does not know; treated as still running
    #[serde(other)]
    Unknown,
}

impl RemoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteStatus::InQueue => "IN_QUEUE",
            RemoteStatus::InProgress => "IN_PROGRESS",
            RemoteStatus::Completed => "COMPLETED",
            RemoteStatus::Failed => "FAILED",
            RemoteStatus::Cancelled => "CANCELLED",
            RemoteStatus::TimedOut => "TIMED_OUT",
            RemoteStatus::Unknown => "UNKNOWN",
        }
    }

    /// Failed, cancelled or timed out on the backend side.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RemoteStatus::Failed | RemoteStatus::Cancelled | RemoteStatus::TimedOut
        )
    }

    pub fn is_terminal(&self) -> bool {
        *self == RemoteStatus::Completed || self.is_failure()
    }
}

impl std::fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `GET /status/{id}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: RemoteStatus,
    /// Worker output; shape depends on the worker image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatusReport {
    pub fn new(status: RemoteStatus) -> Self {
        Self {
            id: None,
            status,
            output: None,
            error: None,
        }
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Error reported at the top level or inside the worker output.
    pub fn error_message(&self) -> Option<String> {
        let from_output = self
            .output
            .as_ref()
            .and_then(|o| o.get("error"))
            .and_then(error_text);

        self.error
            .clone()
            .filter(|e| !e.trim().is_empty())
            .or(from_output)
    }

    /// Base64 image data from the worker output.
    ///
    /// Accepts a bare string, an object with `image_base64` or `image`, or an
    /// object with an `images` array (first entry wins).
    pub fn image_data(&self) -> Option<&str> {
        let output = self.output.as_ref()?;
        let data = match output {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map
                .get("image_base64")
                .or_else(|| map.get("image"))
                .and_then(Value::as_str)
                .or_else(|| {
                    map.get("images")
                        .and_then(Value::as_array)
                        .and_then(|images| images.first())
                        .and_then(Value::as_str)
                }),
            _ => None,
        };
        data.filter(|d| !d.trim().is_empty())
    }
}

fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// `GET /health` response; only used for readiness.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HealthResponse {
    #[serde(default)]
    pub workers: Option<Value>,
}
