//! Provider-side task status.

use serde::{Deserialize, Serialize};

/// Failure message used when the provider reports `FAILED` without details.
pub const GENERIC_PROVIDER_FAILURE: &str = "Task failed on provider without a specific message.";

/// Task state as reported by the generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl ProviderState {
    /// Parse a provider state string. Unrecognized values map to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "PENDING" => ProviderState::Pending,
            "RUNNING" => ProviderState::Running,
            "SUCCEEDED" => ProviderState::Succeeded,
            "FAILED" => ProviderState::Failed,
            _ => ProviderState::Unknown,
        }
    }
}

/// Result of polling a provider task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub state: ProviderState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ProviderStatus {
    pub fn new(state: ProviderState) -> Self {
        Self {
            state,
            video_url: None,
            error_message: None,
        }
    }

    pub fn pending() -> Self {
        Self::new(ProviderState::Pending)
    }

    pub fn running() -> Self {
        Self::new(ProviderState::Running)
    }

    pub fn succeeded(video_url: impl Into<String>) -> Self {
        Self {
            video_url: Some(video_url.into()),
            ..Self::new(ProviderState::Succeeded)
        }
    }

    pub fn failed(error_message: Option<String>) -> Self {
        Self {
            error_message,
            ..Self::new(ProviderState::Failed)
        }
    }

    /// Failure message, falling back to a generic one.
    pub fn failure_message(&self) -> &str {
        match self.error_message.as_deref() {
            Some(msg) if !msg.is_empty() => msg,
            _ => GENERIC_PROVIDER_FAILURE,
        }
    }
}
