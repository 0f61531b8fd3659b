//! One generation request from launch to aggregate.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use reelgen_models::{AggregateResult, AspectRatio, GenerationRequest};
use reelgen_runpod::JobBackend;
use reelgen_storage::ResultUploader;

use crate::config::PollerConfig;
use crate::emitter::StreamEmitter;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::launcher::JobLauncher;
use crate::poller::{PollExit, Poller};

/// Terminal error sent when the streaming task dies unexpectedly.
pub const STREAM_ABORTED_MESSAGE: &str = "Image generation failed unexpectedly";

/// Launches a request's jobs, polls them and aggregates the results.
///
/// Holds no per-request state; records live for the duration of one call.
#[derive(Clone)]
pub struct ImageOrchestrator {
    launcher: JobLauncher,
    poller: Poller,
}

impl ImageOrchestrator {
    pub fn new(
        backend: Arc<dyn JobBackend>,
        uploader: ResultUploader,
        config: PollerConfig,
    ) -> OrchestratorResult<Self> {
        config.validate()?;
        Ok(Self {
            launcher: JobLauncher::new(backend.clone()),
            poller: Poller::new(backend, uploader, config),
        })
    }

    /// Run a request to completion and return the aggregate.
    pub async fn run(&self, request: &GenerationRequest) -> OrchestratorResult<AggregateResult> {
        self.execute(request, None).await.map(|(result, _)| result)
    }

    /// Run a request, streaming progress to `emitter`.
    ///
    /// Ends the stream with `complete` or `error` unless the consumer has
    /// already gone away.
    pub async fn run_streaming(&self, request: &GenerationRequest, mut emitter: StreamEmitter) {
        match self.execute(request, Some(&mut emitter)).await {
            Ok((result, exit)) => {
                if exit != PollExit::Disconnected {
                    emitter.complete(&result).await;
                }
            }
            Err(e) => {
                error!(error = %e, "Streaming generation failed");
                emitter.error(e.to_string()).await;
            }
        }
    }

    /// Run [`run_streaming`](Self::run_streaming) on its own task.
    ///
    /// A supervising task watches it; if the run panics or is cancelled the
    /// stream still ends with an `error` event.
    pub fn spawn_streaming(&self, request: GenerationRequest, emitter: StreamEmitter) -> JoinHandle<()> {
        let mut fallback = emitter.fallback();
        let orchestrator = self.clone();
        let run = tokio::spawn(async move {
            orchestrator.run_streaming(&request, emitter).await;
        });

        tokio::spawn(async move {
            if let Err(e) = run.await {
                error!(error = %e, "Streaming generation task aborted");
                fallback.error(STREAM_ABORTED_MESSAGE).await;
            }
        })
    }

    #[instrument(skip_all, fields(items = request.prompts.len(), project_id = request.project_id()))]
    async fn execute(
        &self,
        request: &GenerationRequest,
        emitter: Option<&mut StreamEmitter>,
    ) -> OrchestratorResult<(AggregateResult, PollExit)> {
        let items = request.items();
        if items.is_empty() {
            return Err(OrchestratorError::EmptyRequest);
        }

        let aspect_ratio = request.parse_aspect_ratio().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid aspect ratio, using {}", AspectRatio::default());
            AspectRatio::default()
        });

        let mut records = self
            .launcher
            .launch_all(&items, request.quality_tier(), aspect_ratio)
            .await;

        let exit = self
            .poller
            .run(&mut records, request.project_id(), emitter)
            .await;

        let result = AggregateResult::from_records(&records);
        info!(
            succeeded = result.succeeded,
            failed = result.failed,
            pending = result.pending,
            exit = ?exit,
            "Generation finished"
        );

        Ok((result, exit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{completed, in_progress, request, ScriptedBackend, Step};
    use reelgen_models::StreamEvent;
    use reelgen_storage::MemoryBlobStore;
    use std::time::Duration;

    fn orchestrator(backend: ScriptedBackend) -> ImageOrchestrator {
        ImageOrchestrator::new(
            Arc::new(backend),
            ResultUploader::new(Arc::new(MemoryBlobStore::new())),
            PollerConfig::default(),
        )
        .unwrap()
    }

    async fn drain(mut rx: tokio::sync::mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_launch_failure() {
        let backend = ScriptedBackend::new()
            .fail_launch("bridge")
            .script("harbor", vec![completed()])
            .script("tower", vec![in_progress(), completed()]);

        let result = orchestrator(backend)
            .run(&request(&["harbor", "bridge", "tower"], Some("proj-9")))
            .await
            .unwrap();

        assert_eq!(
            result.images,
            vec![
                "http://localhost:8000/files/projects/proj-9/image_1.png",
                "http://localhost:8000/files/projects/proj-9/image_3.png",
            ]
        );
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.pending, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_aspect_ratio_launches_with_default() {
        let backend = Arc::new(ScriptedBackend::new().script("fjord", vec![completed()]));
        let orchestrator = ImageOrchestrator::new(
            backend.clone(),
            ResultUploader::new(Arc::new(MemoryBlobStore::new())),
            PollerConfig::default(),
        )
        .unwrap();
        let mut req = request(&["fjord"], None);
        req.aspect_ratio = Some("wide".into());

        let result = orchestrator.run(&req).await.unwrap();

        assert_eq!(result.succeeded, 1);
        assert_eq!(backend.started_jobs()[0].aspect_ratio, AspectRatio::LANDSCAPE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_reports_nothing_failed() {
        let backend = ScriptedBackend::new()
            .script("a", vec![in_progress()])
            .script("b", vec![in_progress()])
            .script("c", vec![in_progress()]);

        let started = tokio::time::Instant::now();
        let result = orchestrator(backend).run(&request(&["a", "b", "c"], None)).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(300));
        assert!(elapsed < Duration::from_secs(303));
        assert!(result.images.is_empty());
        assert_eq!(result.succeeded, 0);
        assert_eq!(result.failed, 0);
        assert_eq!(result.pending, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_ends_with_single_complete() {
        let backend = ScriptedBackend::new()
            .script("dawn", vec![in_progress(), completed()])
            .script("dusk", vec![completed()]);
        let (emitter, rx) = StreamEmitter::channel(32);

        orchestrator(backend)
            .run_streaming(&request(&["dawn", "dusk"], None), emitter)
            .await;
        let events = drain(rx).await;

        assert!(events.len() >= 2);
        assert!(matches!(events[0], StreamEvent::Progress { .. }));
        assert_eq!(
            events.last(),
            Some(&StreamEvent::Complete {
                success: true,
                images: vec![
                    "http://localhost:8000/files/image_1.png".to_string(),
                    "http://localhost:8000/files/image_2.png".to_string(),
                ],
                total: 2,
                failed: 0,
            })
        );
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(
            events[events.len() - 2],
            StreamEvent::Progress {
                completed: 2,
                total: 2,
                message: "Generated 2/2 images".into(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_consumer_does_not_outlive_window() {
        let backend = ScriptedBackend::new().script("slow", vec![in_progress()]);
        let orchestrator = ImageOrchestrator::new(
            Arc::new(backend),
            ResultUploader::new(Arc::new(MemoryBlobStore::new())),
            PollerConfig::default().with_max_window(Duration::from_secs(30)),
        )
        .unwrap();
        // Receiver held open but never read.
        let (emitter, _rx) = StreamEmitter::channel(1);

        let started = tokio::time::Instant::now();
        tokio::time::timeout(
            Duration::from_secs(3600),
            orchestrator.run_streaming(&request(&["slow"], None), emitter),
        )
        .await
        .expect("streaming run should end despite a stalled consumer");

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(30));
        assert!(elapsed <= Duration::from_secs(33) + crate::emitter::TERMINAL_SEND_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_run_still_ends_stream_with_error() {
        let backend = ScriptedBackend::new().script("boom", vec![Step::Panic]);
        let (emitter, rx) = StreamEmitter::channel(8);

        orchestrator(backend)
            .spawn_streaming(request(&["boom"], None), emitter)
            .await
            .unwrap();

        assert_eq!(drain(rx).await, vec![StreamEvent::error(STREAM_ABORTED_MESSAGE)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_run_sends_single_terminal_event() {
        let backend = ScriptedBackend::new().script("calm", vec![completed()]);
        let (emitter, rx) = StreamEmitter::channel(8);

        orchestrator(backend)
            .spawn_streaming(request(&["calm"], None), emitter)
            .await
            .unwrap();

        let events = drain(rx).await;
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(matches!(events.last(), Some(StreamEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn test_empty_request_is_error() {
        let (emitter, rx) = StreamEmitter::channel(4);

        orchestrator(ScriptedBackend::new())
            .run_streaming(&request(&[], None), emitter)
            .await;

        assert_eq!(
            drain(rx).await,
            vec![StreamEvent::error("No prompts to generate")]
        );
    }

    #[tokio::test]
    async fn test_zero_poll_interval_rejected() {
        let result = ImageOrchestrator::new(
            Arc::new(ScriptedBackend::new()),
            ResultUploader::new(Arc::new(MemoryBlobStore::new())),
            PollerConfig::default().with_poll_interval(Duration::ZERO),
        );
        assert!(matches!(result, Err(OrchestratorError::InvalidConfig(_))));
    }
}
