//! Turns base64 job output into a durable public URL.

use std::sync::Arc;
use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use metrics::histogram;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::store::BlobStore;

/// Content type written for every generated image.
pub const IMAGE_CONTENT_TYPE: &str = "image/png";

const UPLOAD_DURATION_SECONDS: &str = "reelgen_upload_duration_seconds";

/// Naming context for an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadTarget {
    pub project_id: Option<String>,
    pub filename: Option<String>,
}

impl UploadTarget {
    pub fn new(project_id: Option<&str>, filename: Option<&str>) -> Self {
        Self {
            project_id: project_id.map(str::to_string),
            filename: filename.map(str::to_string),
        }
    }

    /// Destination key.
    ///
    /// Precedence: project + filename, then filename alone, then a random
    /// name under `generated/`.
    pub fn object_key(&self) -> String {
        let project = self
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let filename = self
            .filename
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match (project, filename) {
            (Some(project), Some(filename)) => format!("projects/{}/{}", project, filename),
            (_, Some(filename)) => filename.to_string(),
            _ => format!("generated/{}.png", Uuid::new_v4()),
        }
    }
}

/// Decodes job payloads and writes them to the blob store.
#[derive(Clone)]
pub struct ResultUploader {
    store: Arc<dyn BlobStore>,
}

impl ResultUploader {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Decode `payload`, upsert it at the target's key and return its
    /// public URL.
    pub async fn upload_base64(&self, payload: &str, target: &UploadTarget) -> StorageResult<String> {
        let bytes = decode_image_payload(payload)?;
        let key = target.object_key();
        let start = Instant::now();

        self.store
            .upload(&key, bytes, IMAGE_CONTENT_TYPE)
            .await?;
        histogram!(UPLOAD_DURATION_SECONDS).record(start.elapsed().as_secs_f64());

        let url = self.store.public_url(&key)?;
        info!(key = %key, "Stored generated image");
        Ok(url)
    }
}

/// Decode a base64 image, accepting an optional `data:<mime>;base64,` prefix.
pub fn decode_image_payload(payload: &str) -> StorageResult<Vec<u8>> {
    let trimmed = payload.trim();
    let encoded = match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| StorageError::decode("malformed data URL"))?,
        None => trimmed,
    };

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| StorageError::decode(e.to_string()))?;

    if bytes.is_empty() {
        return Err(StorageError::decode("payload decoded to zero bytes"));
    }

    debug!("Decoded {} byte image payload", bytes.len());
    Ok(bytes)
}
