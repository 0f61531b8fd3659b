//! Polls launched jobs until they resolve or the window closes.

use std::sync::Arc;

use futures::future::join_all;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use reelgen_models::{JobHandle, JobRecord, ProgressSnapshot, StreamEvent};
use reelgen_runpod::{JobBackend, JobStatusReport, RemoteStatus};
use reelgen_storage::{ResultUploader, UploadTarget};

use crate::config::PollerConfig;
use crate::emitter::StreamEmitter;
use crate::metrics;

/// Why the polling loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// Every record reached a terminal state
    Drained,
    /// The window closed with records still pending
    TimedOut,
    /// The streaming consumer went away
    Disconnected,
}

/// Outcome of one status check.
#[derive(Debug)]
enum CheckOutcome {
    Succeeded(String),
    Failed(String),
    StillPending,
}

/// Drives pending records to a terminal state.
#[derive(Clone)]
pub struct Poller {
    backend: Arc<dyn JobBackend>,
    uploader: ResultUploader,
    config: PollerConfig,
}

impl Poller {
    pub fn new(backend: Arc<dyn JobBackend>, uploader: ResultUploader, config: PollerConfig) -> Self {
        Self {
            backend,
            uploader,
            config,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Poll until every record is terminal, the window closes, or the
    /// consumer disconnects.
    ///
    /// The window is checked between rounds only, so a round in flight
    /// always finishes. Records still pending on exit are left pending.
    pub async fn run(
        &self,
        records: &mut [JobRecord],
        project_id: Option<&str>,
        mut emitter: Option<&mut StreamEmitter>,
    ) -> PollExit {
        let started = Instant::now();
        let mut round = 0u32;

        let exit = loop {
            if !records.iter().any(JobRecord::is_pending) {
                break PollExit::Drained;
            }
            if started.elapsed() >= self.config.max_window {
                break PollExit::TimedOut;
            }
            if emitter.as_deref().is_some_and(|e| !e.is_connected()) {
                break PollExit::Disconnected;
            }

            round += 1;
            self.poll_round(records, project_id).await;

            let snapshot = ProgressSnapshot::from_records(records);
            debug!(round, completed = snapshot.completed, total = snapshot.total, "Poll round finished");

            if let Some(emitter) = emitter.as_deref_mut() {
                if !emitter.emit(StreamEvent::progress(&snapshot)).await {
                    break PollExit::Disconnected;
                }
            }

            if !records.iter().any(JobRecord::is_pending) {
                continue;
            }

            match emitter.as_deref() {
                Some(emitter) => {
                    tokio::select! {
                        _ = sleep(self.config.poll_interval) => {}
                        _ = emitter.closed() => {}
                    }
                }
                None => sleep(self.config.poll_interval).await,
            }
        };

        let abandoned = records.iter().filter(|r| r.is_pending()).count();
        metrics::record_abandoned(abandoned);

        match exit {
            PollExit::Drained => info!(rounds = round, "All generation jobs resolved"),
            PollExit::TimedOut => warn!(
                rounds = round,
                abandoned,
                window_ms = self.config.max_window.as_millis() as u64,
                "Polling window closed with jobs still pending"
            ),
            PollExit::Disconnected => info!(
                rounds = round,
                abandoned,
                "Stream consumer disconnected, polling stopped"
            ),
        }

        exit
    }

    /// Check every pending record once, concurrently, and apply the results.
    async fn poll_round(&self, records: &mut [JobRecord], project_id: Option<&str>) {
        let checks: Vec<_> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_pending())
            .filter_map(|(slot, r)| {
                let handle = r.handle.clone()?;
                let target = UploadTarget::new(project_id, Some(&r.filename));
                Some(async move { (slot, self.check(&handle, &target).await) })
            })
            .collect();

        for (slot, outcome) in join_all(checks).await {
            let record = &mut records[slot];
            match outcome {
                CheckOutcome::Succeeded(url) => {
                    if record.succeed(url) {
                        metrics::record_succeeded();
                    }
                }
                CheckOutcome::Failed(error) => {
                    warn!(origin_index = record.origin_index, error = %error, "Generation job failed");
                    record.fail(error);
                }
                CheckOutcome::StillPending => {}
            }
        }
    }

    async fn check(&self, handle: &JobHandle, target: &UploadTarget) -> CheckOutcome {
        let report = match self.backend.status(handle).await {
            Ok(report) => report,
            Err(e) => {
                warn!(
                    job_handle = %handle,
                    error = %e,
                    transient = e.is_transient(),
                    "Status check failed, will retry"
                );
                return CheckOutcome::StillPending;
            }
        };

        match report.status {
            RemoteStatus::Completed => self.collect(handle, &report, target).await,
            status if status.is_failure() => {
                metrics::record_failed("remote");
                CheckOutcome::Failed(
                    report
                        .error_message()
                        .unwrap_or_else(|| format!("Job {}", status)),
                )
            }
            status => {
                debug!(job_handle = %handle, status = %status, "Job still running");
                CheckOutcome::StillPending
            }
        }
    }

    /// Store the output of a completed job.
    async fn collect(&self, handle: &JobHandle, report: &JobStatusReport, target: &UploadTarget) -> CheckOutcome {
        if let Some(error) = report.error_message() {
            metrics::record_failed("remote");
            return CheckOutcome::Failed(error);
        }

        let Some(payload) = report.image_data() else {
            metrics::record_failed("remote");
            return CheckOutcome::Failed("No image data returned".to_string());
        };

        match self.uploader.upload_base64(payload, target).await {
            Ok(url) => {
                info!(job_handle = %handle, url = %url, "Generated image stored");
                CheckOutcome::Succeeded(url)
            }
            Err(e) => {
                metrics::record_failed("upload");
                CheckOutcome::Failed(format!("Upload failed: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::JobLauncher;
    use crate::test_support::{completed, in_progress, items, report, ScriptedBackend, Step};
    use reelgen_models::{AggregateResult, AspectRatio, JobState, QualityTier};
    use reelgen_storage::MemoryBlobStore;
    use serde_json::json;
    use std::time::Duration;

    fn config() -> PollerConfig {
        PollerConfig::default()
            .with_poll_interval(Duration::from_secs(3))
            .with_max_window(Duration::from_secs(10))
    }

    async fn launch_and_poll(
        backend: ScriptedBackend,
        prompts: &[&str],
    ) -> (Vec<JobRecord>, PollExit, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        let uploader = ResultUploader::new(Arc::new(MemoryBlobStore::new()));
        let mut records = JobLauncher::new(backend.clone())
            .launch_all(&items(prompts), QualityTier::Basic, AspectRatio::default())
            .await;

        let exit = Poller::new(backend.clone(), uploader, config())
            .run(&mut records, None, None)
            .await;
        (records, exit, backend)
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_origin_order() {
        let backend = ScriptedBackend::new()
            .script("first", vec![in_progress(), in_progress(), completed()])
            .script("second", vec![in_progress(), completed()])
            .script("third", vec![completed()]);

        let (records, exit, _) = launch_and_poll(backend, &["first", "second", "third"]).await;

        assert_eq!(exit, PollExit::Drained);
        let result = AggregateResult::from_records(&records);
        assert_eq!(
            result.images,
            vec![
                "http://localhost:8000/files/image_1.png",
                "http://localhost:8000/files/image_2.png",
                "http://localhost:8000/files/image_3.png",
            ]
        );
        assert_eq!(result.failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_abandons_pending_jobs() {
        let backend = ScriptedBackend::new()
            .script("stuck a", vec![in_progress()])
            .script("stuck b", vec![in_progress()]);

        let started = Instant::now();
        let (records, exit, backend) = launch_and_poll(backend, &["stuck a", "stuck b"]).await;
        let elapsed = started.elapsed();

        assert_eq!(exit, PollExit::TimedOut);
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_secs(10) + Duration::from_secs(3));

        let result = AggregateResult::from_records(&records);
        assert!(result.images.is_empty());
        assert_eq!(result.failed, 0);
        assert_eq!(result.pending, 2);
        assert!(records.iter().all(|r| r.state == JobState::Pending));
        // Rounds at 0s, 3s, 6s and 9s.
        assert_eq!(backend.status_calls(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_without_image_fails() {
        let backend = ScriptedBackend::new().script(
            "empty",
            vec![report(JobStatusReport::new(RemoteStatus::Completed).with_output(json!({ "seed": 7 })))],
        );

        let (records, _, _) = launch_and_poll(backend, &["empty"]).await;

        assert_eq!(records[0].state, JobState::Fail);
        assert_eq!(records[0].error.as_deref(), Some("No image data returned"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecodable_payload_is_upload_failure() {
        let backend = ScriptedBackend::new().script(
            "garbled",
            vec![report(
                JobStatusReport::new(RemoteStatus::Completed).with_output(json!({ "image_base64": "%%%not-base64" })),
            )],
        );

        let (records, _, _) = launch_and_poll(backend, &["garbled"]).await;

        assert_eq!(records[0].state, JobState::Fail);
        assert!(records[0].error.as_deref().unwrap().starts_with("Upload failed: "));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failures() {
        let backend = ScriptedBackend::new()
            .script(
                "crashed",
                vec![report(JobStatusReport::new(RemoteStatus::Failed).with_error("CUDA out of memory"))],
            )
            .script("cancelled", vec![report(JobStatusReport::new(RemoteStatus::Cancelled))])
            .script(
                "filtered",
                vec![report(
                    JobStatusReport::new(RemoteStatus::Completed)
                        .with_output(json!({ "error": "NSFW content detected", "image_base64": "abc" })),
                )],
            );

        let (records, exit, _) = launch_and_poll(backend, &["crashed", "cancelled", "filtered"]).await;

        assert_eq!(exit, PollExit::Drained);
        assert_eq!(records[0].error.as_deref(), Some("CUDA out of memory"));
        assert_eq!(records[1].error.as_deref(), Some("Job CANCELLED"));
        assert_eq!(records[2].error.as_deref(), Some("NSFW content detected"));
        assert!(records.iter().all(|r| r.state == JobState::Fail));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_keep_job_pending() {
        let backend = ScriptedBackend::new().script(
            "flaky",
            vec![Step::TransportError, Step::TransportError, completed()],
        );

        let (records, exit, backend) = launch_and_poll(backend, &["flaky"]).await;

        assert_eq!(exit, PollExit::Drained);
        assert_eq!(records[0].state, JobState::Success);
        assert_eq!(backend.status_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_launches_are_not_polled() {
        let backend = ScriptedBackend::new()
            .fail_launch("broken")
            .script("fine", vec![completed()]);

        let (records, exit, backend) = launch_and_poll(backend, &["fine", "broken"]).await;

        assert_eq!(exit, PollExit::Drained);
        assert_eq!(backend.status_calls(), 1);
        let result = AggregateResult::from_records(&records);
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_stops_polling() {
        let backend = Arc::new(ScriptedBackend::new().script("slow", vec![in_progress()]));
        let uploader = ResultUploader::new(Arc::new(MemoryBlobStore::new()));
        let mut records = JobLauncher::new(backend.clone())
            .launch_all(&items(&["slow"]), QualityTier::Basic, AspectRatio::default())
            .await;

        let (mut emitter, mut rx) = StreamEmitter::channel(4);
        let consumer = tokio::spawn(async move {
            let first = rx.recv().await;
            drop(rx);
            first
        });

        let started = Instant::now();
        let exit = Poller::new(backend.clone(), uploader, PollerConfig::default())
            .run(&mut records, None, Some(&mut emitter))
            .await;

        assert_eq!(exit, PollExit::Disconnected);
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(backend.status_calls(), 1);
        assert!(matches!(consumer.await.unwrap(), Some(StreamEvent::Progress { .. })));
        assert_eq!(records[0].state, JobState::Pending);
    }
}
