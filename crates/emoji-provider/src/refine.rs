//! Prompt refinement through a chat-completion model.

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use tracing::{debug, warn};

use crate::client::build_http_client;
use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::wire::{ChatMessage, ChatRequest, ChatResponse};

const CHAT_PATH: &str = "/compatible-mode/v1/chat/completions";

/// System instruction used to expand a role into a visual description.
pub const ROLE_SYSTEM_PROMPT: &str = "You are a master of character portrayal. Using web search, \
describe this character's appearance, build, colours and overall look in detail. \
Output only the final description, without any markdown formatting or headings.";

/// Rewrites raw text into a richer prompt.
#[async_trait]
pub trait PromptRefiner: Send + Sync {
    /// Refine `text`, failing on transport or parse errors.
    async fn refine(&self, text: &str) -> ProviderResult<String>;

    /// Refine `text`, falling back to the input on any failure.
    async fn refine_or_original(&self, text: &str) -> String {
        match self.refine(text).await {
            Ok(refined) => refined,
            Err(e) => {
                warn!(error = %e, "Prompt refinement failed, using original text");
                text.to_string()
            }
        }
    }
}

/// DashScope chat-completion refiner.
#[derive(Clone)]
pub struct DashScopeRefiner {
    http: Client,
    config: ProviderConfig,
}

impl DashScopeRefiner {
    /// Create a refiner using the role description instruction.
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        Ok(Self {
            http: build_http_client(&config)?,
            config,
        })
    }
}

#[async_trait]
impl PromptRefiner for DashScopeRefiner {
    async fn refine(&self, text: &str) -> ProviderResult<String> {
        let url = format!("{}{}", self.config.base_url, CHAT_PATH);
        let body = ChatRequest {
            model: &self.config.refinement_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: ROLE_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            enable_search: true,
            forced_search: true,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::refinement(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| ProviderError::refinement(e.to_string()))?;

        if !status.is_success() {
            counter!("emoji_provider_requests_total", "op" => "refine", "outcome" => "error")
                .increment(1);
            return Err(ProviderError::refinement(format!(
                "model returned {}: {}",
                status, raw
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&raw).map_err(|e| {
            ProviderError::refinement(format!("Failed to parse response: {}, response: {}", e, raw))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ProviderError::refinement("no content in response"))?;

        counter!("emoji_provider_requests_total", "op" => "refine", "outcome" => "ok").increment(1);
        debug!(chars = content.len(), "Prompt refined");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn refiner(server: &MockServer) -> DashScopeRefiner {
        DashScopeRefiner::new(ProviderConfig::new("test-key", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_refine_extracts_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .and(body_partial_json(json!({
                "model": "qwen-flash",
                "enable_search": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "  A small yellow mouse.  "}},
                    {"message": {"role": "assistant", "content": "ignored"}}
                ]
            })))
            .mount(&server)
            .await;

        let refined = refiner(&server).refine("Pikachu").await.unwrap();
        assert_eq!(refined, "A small yellow mouse.");
    }

    #[tokio::test]
    async fn test_refine_empty_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = refiner(&server).refine("Pikachu").await.unwrap_err();
        assert!(matches!(err, ProviderError::Refinement(_)));
    }

    #[tokio::test]
    async fn test_refine_or_original_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let text = refiner(&server).refine_or_original("Pikachu").await;
        assert_eq!(text, "Pikachu");
    }
}
