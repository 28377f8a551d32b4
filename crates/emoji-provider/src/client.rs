//! Generation provider client.

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use tracing::{debug, info, warn};

use emoji_models::{GenerationRequest, ProviderState, ProviderStatus};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::wire::{SynthesisRequest, TaskResponse};

const SYNTHESIS_PATH: &str = "/api/v1/services/aigc/video-generation/video-synthesis";
const TASKS_PATH: &str = "/api/v1/tasks";

/// External asynchronous video generation service.
///
/// Each call performs a single network request; retries are up to the caller.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Submit a generation task and return the provider task handle.
    async fn submit(&self, request: &GenerationRequest) -> ProviderResult<String>;

    /// Fetch the current provider-side state of a task.
    async fn poll(&self, task_id: &str) -> ProviderResult<ProviderStatus>;
}

/// DashScope video synthesis client.
#[derive(Clone)]
pub struct DashScopeClient {
    http: Client,
    config: ProviderConfig,
}

impl DashScopeClient {
    /// Create a new client.
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let http = build_http_client(&config)?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ProviderConfig::from_env()?)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

pub(crate) fn build_http_client(config: &ProviderConfig) -> ProviderResult<Client> {
    Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(concat!("emoji-provider/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::config(format!("Failed to build HTTP client: {}", e)))
}

#[async_trait]
impl GenerationProvider for DashScopeClient {
    async fn submit(&self, request: &GenerationRequest) -> ProviderResult<String> {
        let body = SynthesisRequest::from_request(&self.config, request);
        let url = format!("{}{}", self.config.base_url, SYNTHESIS_PATH);
        debug!(model = body.model, kind = request.kind().as_str(), "Submitting generation task");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("X-DashScope-Async", "enable")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                counter!("emoji_provider_requests_total", "op" => "submit", "outcome" => "error")
                    .increment(1);
                ProviderError::submission(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::submission(e.to_string()))?;

        let parsed: Option<TaskResponse> = serde_json::from_str(&text).ok();

        if let Some(code) = parsed.as_ref().and_then(|r| r.error_code()) {
            let message = parsed
                .as_ref()
                .and_then(|r| r.message.clone())
                .unwrap_or_else(|| code.to_string());
            warn!(code = code, status = %status, "Provider rejected generation task");
            counter!("emoji_provider_requests_total", "op" => "submit", "outcome" => "rejected")
                .increment(1);
            return Err(ProviderError::Submission(message));
        }

        if !status.is_success() {
            counter!("emoji_provider_requests_total", "op" => "submit", "outcome" => "error")
                .increment(1);
            return Err(ProviderError::submission(format!(
                "provider returned {}: {}",
                status, text
            )));
        }

        let parsed = parsed.ok_or_else(|| {
            ProviderError::submission(format!("Failed to parse provider response: {}", text))
        })?;

        let task_id = parsed
            .output
            .task_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::submission("provider response carried no task_id"))?;

        counter!("emoji_provider_requests_total", "op" => "submit", "outcome" => "ok").increment(1);
        info!(
            task_id = %task_id,
            request_id = parsed.request_id.as_deref().unwrap_or(""),
            "Generation task submitted"
        );
        Ok(task_id)
    }

    async fn poll(&self, task_id: &str) -> ProviderResult<ProviderStatus> {
        let url = format!("{}{}/{}", self.config.base_url, TASKS_PATH, task_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| {
                counter!("emoji_provider_requests_total", "op" => "poll", "outcome" => "error")
                    .increment(1);
                ProviderError::query(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::query(e.to_string()))?;

        if !status.is_success() {
            counter!("emoji_provider_requests_total", "op" => "poll", "outcome" => "error")
                .increment(1);
            return Err(ProviderError::query(format!(
                "provider returned {}: {}",
                status, text
            )));
        }

        let parsed: TaskResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::query(format!(
                "Failed to parse provider response: {}, response body: {}",
                e, text
            ))
        })?;

        let state = ProviderState::parse(parsed.output.task_status.as_deref().unwrap_or(""));
        counter!("emoji_provider_requests_total", "op" => "poll", "outcome" => "ok").increment(1);
        debug!(task_id = task_id, state = ?state, "Polled generation task");

        let result = match state {
            ProviderState::Succeeded => ProviderStatus {
                video_url: parsed.output.video_url.filter(|u| !u.is_empty()),
                ..ProviderStatus::new(state)
            },
            ProviderState::Failed => ProviderStatus::failed(
                parsed
                    .output
                    .message
                    .filter(|m| !m.is_empty())
                    .or(parsed.message.filter(|m| !m.is_empty())),
            ),
            other => ProviderStatus::new(other),
        };
        Ok(result)
    }
}
