//! Shared data models for the reelgen backend.
//!
//! This crate provides Serde-serializable types for:
//! - Generation requests and prompt items
//! - Quality tiers and aspect ratios
//! - Per-item job records and their lifecycle
//! - Progress snapshots and the final aggregate
//! - Server-sent event schemas

pub mod events;
pub mod job;
pub mod progress;
pub mod prompt;
pub mod request;

// Re-export common types
pub use events::{GenerateImagesResponse, StreamEvent, StreamEventType};
pub use job::{JobHandle, JobRecord, JobState};
pub use progress::{AggregateResult, ProgressSnapshot};
pub use prompt::{NormalizedItem, PromptItem, PromptList, TimedPrompt};
pub use request::{AspectRatio, AspectRatioParseError, GenerationRequest, QualityTier};
