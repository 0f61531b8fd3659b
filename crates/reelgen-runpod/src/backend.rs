//! Job backend capability.

use async_trait::async_trait;

use reelgen_models::JobHandle;

use crate::error::BackendResult;
use crate::types::{JobStatusReport, StartJob};

/// Remote service that runs one generation job per prompt.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Submit a job and return its handle.
    async fn start(&self, job: &StartJob) -> BackendResult<JobHandle>;

    /// Current status of a previously started job.
    async fn status(&self, handle: &JobHandle) -> BackendResult<JobStatusReport>;

    /// Whether the backend is reachable and accepting work.
    async fn health_check(&self) -> bool;

    /// Short backend name for logs and readiness output.
    fn backend_name(&self) -> &'static str;
}
