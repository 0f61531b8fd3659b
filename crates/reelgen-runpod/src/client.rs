//! RunPod serverless HTTP client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use reelgen_models::JobHandle;

use crate::backend::JobBackend;
use crate::error::{BackendError, BackendResult};
use crate::types::{HealthResponse, JobStatusReport, RunRequest, RunResponse, StartJob};

const DEFAULT_BASE_URL: &str = "https://api.runpod.ai/v2";

/// Configuration for the RunPod client.
#[derive(Clone)]
pub struct RunPodConfig {
    /// API base URL
    pub base_url: String,
    /// Serverless endpoint id
    pub endpoint_id: String,
    /// API key (bearer token)
    pub api_key: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl fmt::Debug for RunPodConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunPodConfig")
            .field("base_url", &self.base_url)
            .field("endpoint_id", &self.endpoint_id)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RunPodConfig {
    pub fn new(endpoint_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint_id: endpoint_id.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create config from environment variables.
    ///
    /// `RUNPOD_API_KEY` and `RUNPOD_ENDPOINT_ID` are required.
    pub fn from_env() -> BackendResult<Self> {
        let api_key = std::env::var("RUNPOD_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| BackendError::config("RUNPOD_API_KEY not set"))?;
        let endpoint_id = std::env::var("RUNPOD_ENDPOINT_ID")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| BackendError::config("RUNPOD_ENDPOINT_ID not set"))?;

        Ok(Self {
            base_url: std::env::var("RUNPOD_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            endpoint_id,
            api_key,
            timeout: Duration::from_secs(
                std::env::var("RUNPOD_REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        })
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint_id,
            path
        )
    }
}

/// Client for a RunPod serverless endpoint.
pub struct RunPodClient {
    http: Client,
    config: RunPodConfig,
}

impl RunPodClient {
    /// Create a new client.
    pub fn new(config: RunPodConfig) -> BackendResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(BackendError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> BackendResult<Self> {
        Self::new(RunPodConfig::from_env()?)
    }

    pub fn config(&self) -> &RunPodConfig {
        &self.config
    }
}

#[async_trait]
impl JobBackend for RunPodClient {
    async fn start(&self, job: &StartJob) -> BackendResult<JobHandle> {
        let url = self.config.endpoint_url("run");
        debug!(quality = %job.quality, aspect_ratio = %job.aspect_ratio, "Submitting generation job to {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&RunRequest::from(job))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Launch { status, body });
        }

        let run: RunResponse = response.json().await?;
        let id = run
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or(BackendError::MissingHandle)?;

        info!(job_handle = %id, "Generation job started");
        Ok(JobHandle::new(id))
    }

    async fn status(&self, handle: &JobHandle) -> BackendResult<JobStatusReport> {
        let url = self.config.endpoint_url(&format!("status/{}", handle));

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::RequestFailed(format!(
                "Status check returned {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    async fn health_check(&self) -> bool {
        let url = self.config.endpoint_url("health");

        match self
            .http
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                match response.json::<HealthResponse>().await {
                    Ok(health) => {
                        debug!(workers = ?health.workers, "RunPod endpoint healthy");
                        true
                    }
                    Err(e) => {
                        warn!("RunPod health response unreadable: {}", e);
                        false
                    }
                }
            }
            Ok(response) => {
                warn!("RunPod health check failed: {}", response.status());
                false
            }
            Err(e) => {
                warn!("RunPod health check error: {}", e);
                false
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "runpod"
    }
}
