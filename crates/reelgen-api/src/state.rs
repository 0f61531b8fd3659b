//! Application state.

use std::sync::Arc;

use tracing::{info, warn};

use reelgen_orchestrator::{ImageOrchestrator, PollerConfig};
use reelgen_runpod::{JobBackend, RunPodClient};
use reelgen_storage::{BlobStore, MemoryBlobStore, ResultUploader, S3BlobStore};

use crate::config::{ApiConfig, StorageBackend};
use crate::error::{ApiError, ApiResult};

/// Collaborators needed to serve generation requests.
pub struct GenerationServices {
    pub orchestrator: ImageOrchestrator,
    pub backend: Arc<dyn JobBackend>,
    pub storage: Arc<dyn BlobStore>,
}

/// Shared application state.
///
/// Missing credentials do not stop the server: the state is built without
/// generation services and the affected routes report the reason.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    generation: Result<Arc<GenerationServices>, String>,
}

impl AppState {
    /// State with explicitly constructed collaborators.
    pub fn new(
        config: ApiConfig,
        backend: Arc<dyn JobBackend>,
        storage: Arc<dyn BlobStore>,
        poller: PollerConfig,
    ) -> ApiResult<Self> {
        let orchestrator = ImageOrchestrator::new(
            Arc::clone(&backend),
            ResultUploader::new(Arc::clone(&storage)),
            poller,
        )?;

        Ok(Self {
            config,
            generation: Ok(Arc::new(GenerationServices {
                orchestrator,
                backend,
                storage,
            })),
        })
    }

    /// State that serves probes only; generation answers with `reason`.
    pub fn unconfigured(config: ApiConfig, reason: impl Into<String>) -> Self {
        Self {
            config,
            generation: Err(reason.into()),
        }
    }

    /// Build state from environment variables.
    pub fn from_env(config: ApiConfig) -> Self {
        let backend = RunPodClient::from_env()
            .map(|client| Arc::new(client) as Arc<dyn JobBackend>)
            .map_err(|e| e.to_string());
        let storage = blob_store_from_env(config.storage_backend);

        let state = match (backend, storage) {
            (Ok(backend), Ok(storage)) => {
                info!(
                    backend = backend.backend_name(),
                    storage = storage.backend_name(),
                    "Generation services configured"
                );
                Self::new(config.clone(), backend, storage, PollerConfig::from_env())
                    .unwrap_or_else(|e| Self::unconfigured(config, e.to_string()))
            }
            (backend, storage) => {
                let reasons: Vec<String> = [backend.err(), storage.err()].into_iter().flatten().collect();
                Self::unconfigured(config, reasons.join("; "))
            }
        };

        if let Err(reason) = &state.generation {
            warn!("Image generation disabled: {}", reason);
        }
        state
    }

    /// Generation services, or the configuration problem preventing them.
    pub fn generation(&self) -> ApiResult<&GenerationServices> {
        match &self.generation {
            Ok(services) => Ok(services.as_ref()),
            Err(reason) => Err(ApiError::not_configured(reason.clone())),
        }
    }
}

fn blob_store_from_env(backend: StorageBackend) -> Result<Arc<dyn BlobStore>, String> {
    match backend {
        StorageBackend::S3 => S3BlobStore::from_env()
            .map(|store| Arc::new(store) as Arc<dyn BlobStore>)
            .map_err(|e| e.to_string()),
        StorageBackend::Memory => {
            let store = match std::env::var("STORAGE_PUBLIC_URL") {
                Ok(base) => MemoryBlobStore::with_public_base(&base).map_err(|e| e.to_string())?,
                Err(_) => MemoryBlobStore::new(),
            };
            warn!("Using in-memory blob store; generated images are not persisted");
            Ok(Arc::new(store))
        }
    }
}
