//! Provider wire format.

use serde::{Deserialize, Serialize};

use emoji_models::GenerationRequest;

use crate::config::ProviderConfig;

#[derive(Debug, Serialize)]
pub(crate) struct SynthesisRequest<'a> {
    pub model: &'a str,
    pub input: SynthesisInput<'a>,
    pub parameters: SynthesisParameters<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SynthesisInput<'a> {
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SynthesisParameters<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<&'a str>,
}

impl<'a> SynthesisRequest<'a> {
    /// Translate a generation request, picking the model by request kind.
    pub fn from_request(config: &'a ProviderConfig, request: &'a GenerationRequest) -> Self {
        match request {
            GenerationRequest::TextToVideo {
                prompt,
                negative_prompt,
                size,
            } => Self {
                model: &config.text_to_video_model,
                input: SynthesisInput {
                    prompt,
                    negative_prompt: negative_prompt.as_deref(),
                    img_url: None,
                },
                parameters: SynthesisParameters {
                    size: Some(size.as_str()),
                    resolution: None,
                },
            },
            GenerationRequest::ImageToVideo {
                prompt,
                negative_prompt,
                resolution,
                img_base64,
            } => Self {
                model: &config.image_to_video_model,
                input: SynthesisInput {
                    prompt,
                    negative_prompt: negative_prompt.as_deref(),
                    img_url: Some(img_base64.as_str()),
                },
                parameters: SynthesisParameters {
                    size: None,
                    resolution: Some(resolution.as_str()),
                },
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TaskOutput {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub task_status: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response to both task submission and task query.
#[derive(Debug, Deserialize)]
pub(crate) struct TaskResponse {
    #[serde(default)]
    pub output: TaskOutput,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TaskResponse {
    /// Provider-reported error code, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.code.as_deref().filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub enable_search: bool,
    pub forced_search: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoiceMessage {
    #[serde(default)]
    pub content: String,
}
