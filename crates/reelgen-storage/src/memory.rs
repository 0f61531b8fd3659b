//! In-memory blob store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::error::StorageResult;
use crate::store::{join_public_url, parse_public_base, validate_key, BlobStore};

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Blob store kept in process memory.
///
/// Used for local development without object storage credentials and as
/// the store behind tests. Same upsert semantics as the S3 client.
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    public_base: Url,
}

impl MemoryBlobStore {
    pub const DEFAULT_PUBLIC_BASE: &'static str = "http://localhost:8000/files/";

    pub fn new() -> Self {
        Self::with_public_base(Self::DEFAULT_PUBLIC_BASE)
            .expect("default public base is a valid URL")
    }

    pub fn with_public_base(base: &str) -> StorageResult<Self> {
        Ok(Self {
            objects: RwLock::new(HashMap::new()),
            public_base: parse_public_base(base)?,
        })
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        validate_key(key)?;
        debug!("Storing {} bytes at {}", data.len(), key);
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, key: &str) -> StorageResult<String> {
        join_public_url(&self.public_base, key)
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
