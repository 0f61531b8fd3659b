//! Image generation orchestration.
//!
//! One [`ImageOrchestrator`] run takes a [`GenerationRequest`], starts one
//! remote job per prompt, polls the jobs until they resolve or the window
//! closes, stores each result and reports the aggregate. Streaming callers
//! get progress through a [`StreamEmitter`].
//!
//! [`GenerationRequest`]: reelgen_models::GenerationRequest

pub mod config;
pub mod emitter;
pub mod error;
pub mod launcher;
pub mod metrics;
pub mod orchestrator;
pub mod poller;

#[cfg(test)]
mod test_support;

pub use config::PollerConfig;
pub use emitter::StreamEmitter;
pub use error::{OrchestratorError, OrchestratorResult};
pub use launcher::JobLauncher;
pub use orchestrator::ImageOrchestrator;
pub use poller::{PollExit, Poller};
