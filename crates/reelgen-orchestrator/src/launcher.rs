//! Starts one remote job per work item.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use reelgen_models::{AspectRatio, JobRecord, NormalizedItem, QualityTier};
use reelgen_runpod::{JobBackend, StartJob};

use crate::metrics;

/// Issues all launches of a batch concurrently.
#[derive(Clone)]
pub struct JobLauncher {
    backend: Arc<dyn JobBackend>,
}

impl JobLauncher {
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        Self { backend }
    }

    /// Launch every item and return one record per item, in item order.
    ///
    /// A failed launch yields a `fail` record and never affects the other
    /// items. Launches are not retried.
    pub async fn launch_all(
        &self,
        items: &[NormalizedItem],
        quality: QualityTier,
        aspect_ratio: AspectRatio,
    ) -> Vec<JobRecord> {
        info!(
            items = items.len(),
            backend = self.backend.backend_name(),
            quality = %quality,
            aspect_ratio = %aspect_ratio,
            "Launching generation jobs"
        );

        let launches = items
            .iter()
            .map(|item| self.launch_one(item, quality, aspect_ratio));

        join_all(launches).await
    }

    async fn launch_one(
        &self,
        item: &NormalizedItem,
        quality: QualityTier,
        aspect_ratio: AspectRatio,
    ) -> JobRecord {
        let job = StartJob {
            prompt: item.prompt.clone(),
            quality,
            aspect_ratio,
        };

        match self.backend.start(&job).await {
            Ok(handle) => {
                info!(origin_index = item.origin_index, job_handle = %handle, "Job launched");
                metrics::record_launched();
                JobRecord::launched(item, handle)
            }
            Err(e) => {
                warn!(origin_index = item.origin_index, error = %e, "Job launch failed");
                metrics::record_failed("launch");
                JobRecord::launch_failed(item, format!("Failed to start job: {}", e))
            }
        }
    }
}
