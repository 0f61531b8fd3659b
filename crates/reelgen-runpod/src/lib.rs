//! Job backend for image generation.
//!
//! This crate defines the [`JobBackend`] capability the orchestrator drives
//! (start a job, check its status) and a client for RunPod's serverless
//! endpoint API that implements it.

pub mod backend;
pub mod client;
pub mod error;
pub mod types;

pub use backend::JobBackend;
pub use client::{RunPodClient, RunPodConfig};
pub use error::{BackendError, BackendResult};
pub use types::{JobStatusReport, RemoteStatus, StartJob};
