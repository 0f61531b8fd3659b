//! Scripted job backend and fixtures shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use reelgen_models::{GenerationRequest, JobHandle, NormalizedItem, PromptList};
use reelgen_runpod::{BackendError, BackendResult, JobBackend, JobStatusReport, RemoteStatus, StartJob};

/// Decodes to the 8-byte PNG signature.
pub const PNG_B64: &str = "iVBORw0KGgo=";

/// One scripted answer to a status check.
#[derive(Debug, Clone)]
pub enum Step {
    Report(JobStatusReport),
    TransportError,
    /// The backend itself panics mid-check
    Panic,
}

pub fn in_progress() -> Step {
    Step::Report(JobStatusReport::new(RemoteStatus::InProgress))
}

pub fn completed() -> Step {
    Step::Report(JobStatusReport::new(RemoteStatus::Completed).with_output(json!({ "image_base64": PNG_B64 })))
}

pub fn report(report: JobStatusReport) -> Step {
    Step::Report(report)
}

/// Job backend driven by per-prompt scripts.
///
/// Each prompt's handle is `job-<prompt>`. A status check pops the next step
/// of that handle's script; the last step repeats forever. Unscripted
/// handles stay in the queue.
#[derive(Default)]
pub struct ScriptedBackend {
    failing_prompts: HashSet<String>,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    started: Mutex<Vec<StartJob>>,
    status_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_launch(mut self, prompt: &str) -> Self {
        self.failing_prompts.insert(prompt.to_string());
        self
    }

    pub fn script(self, prompt: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(format!("job-{}", prompt), steps.into());
        self
    }

    pub fn start_calls(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    pub fn started_jobs(&self) -> Vec<StartJob> {
        self.started.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    async fn start(&self, job: &StartJob) -> BackendResult<JobHandle> {
        self.started.lock().unwrap().push(job.clone());
        if self.failing_prompts.contains(&job.prompt) {
            return Err(BackendError::Launch {
                status: 500,
                body: "worker pool exhausted".into(),
            });
        }
        Ok(JobHandle::new(format!("job-{}", job.prompt)))
    }

    async fn status(&self, handle: &JobHandle) -> BackendResult<JobStatusReport> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        let step = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(handle.as_str()) {
                Some(script) if script.len() > 1 => script.pop_front(),
                Some(script) => script.front().cloned(),
                None => None,
            }
        };

        match step {
            Some(Step::Report(report)) => Ok(report),
            Some(Step::TransportError) => Err(BackendError::RequestFailed("connection reset".into())),
            Some(Step::Panic) => panic!("status check exploded for {}", handle),
            None => Ok(JobStatusReport::new(RemoteStatus::InQueue)),
        }
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

pub fn items(prompts: &[&str]) -> Vec<NormalizedItem> {
    plain(prompts).normalize()
}

pub fn request(prompts: &[&str], project_id: Option<&str>) -> GenerationRequest {
    GenerationRequest {
        prompts: plain(prompts),
        quality: "high".into(),
        aspect_ratio: None,
        stream: false,
        project_id: project_id.map(str::to_string),
    }
}

fn plain(prompts: &[&str]) -> PromptList {
    PromptList::Plain(prompts.iter().map(|p| p.to_string()).collect())
}
