//! Object storage for generated images.
//!
//! This crate provides:
//! - The [`BlobStore`] capability (upsert bytes, resolve a public URL)
//! - An S3-compatible client (Supabase Storage, R2, MinIO)
//! - An in-memory store for local development and tests
//! - The [`ResultUploader`] that turns base64 job output into a public URL

pub mod client;
pub mod error;
pub mod memory;
pub mod store;
pub mod uploader;

pub use client::{S3BlobStore, S3Config};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBlobStore;
pub use store::BlobStore;
pub use uploader::{ResultUploader, UploadTarget, IMAGE_CONTENT_TYPE};
