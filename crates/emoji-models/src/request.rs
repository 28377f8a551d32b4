//! Generation requests and creation-request validation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::error::{ModelError, ModelResult};

/// Kind of generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    TextToVideo,
    ImageToVideo,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKind::TextToVideo => "text_to_video",
            GenerationKind::ImageToVideo => "image_to_video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text_to_video" => Some(GenerationKind::TextToVideo),
            "image_to_video" => Some(GenerationKind::ImageToVideo),
            _ => None,
        }
    }
}

/// A validated generation request, as persisted on the job record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationRequest {
    TextToVideo {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        negative_prompt: Option<String>,
        /// Output size, e.g. `1280*720`
        size: String,
    },
    ImageToVideo {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        negative_prompt: Option<String>,
        /// Resolution tier, e.g. `480P`
        resolution: String,
        /// Source image (base64 payload or data URI)
        img_base64: String,
    },
}

impl GenerationRequest {
    pub fn kind(&self) -> GenerationKind {
        match self {
            GenerationRequest::TextToVideo { .. } => GenerationKind::TextToVideo,
            GenerationRequest::ImageToVideo { .. } => GenerationKind::ImageToVideo,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            GenerationRequest::TextToVideo { prompt, .. }
            | GenerationRequest::ImageToVideo { prompt, .. } => prompt,
        }
    }

    pub fn negative_prompt(&self) -> Option<&str> {
        match self {
            GenerationRequest::TextToVideo { negative_prompt, .. }
            | GenerationRequest::ImageToVideo { negative_prompt, .. } => negative_prompt.as_deref(),
        }
    }
}

/// Raw job creation request as received from clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateJobRequest {
    /// `text_to_video` or `image_to_video`
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Prompt is required"))]
    pub prompt: String,

    #[serde(default)]
    pub negative_prompt: Option<String>,

    /// Required for text-to-video
    #[serde(default)]
    pub size: Option<String>,

    /// Required for image-to-video
    #[serde(default)]
    pub resolution: Option<String>,

    /// Required for image-to-video
    #[serde(default)]
    pub img_base64: Option<String>,
}

impl CreateJobRequest {
    /// Validate the request shape and convert it into a [`GenerationRequest`].
    pub fn into_generation_request(self) -> ModelResult<GenerationRequest> {
        let kind = GenerationKind::parse(&self.kind).ok_or_else(|| {
            ModelError::validation("Invalid type. Must be 'text_to_video' or 'image_to_video'")
        })?;
        self.validate().map_err(first_message)?;

        let negative_prompt = non_empty(self.negative_prompt);
        match kind {
            GenerationKind::TextToVideo => {
                let size = non_empty(self.size)
                    .ok_or_else(|| ModelError::validation("Size is required for text_to_video"))?;
                Ok(GenerationRequest::TextToVideo {
                    prompt: self.prompt,
                    negative_prompt,
                    size,
                })
            }
            GenerationKind::ImageToVideo => {
                let resolution = non_empty(self.resolution).ok_or_else(|| {
                    ModelError::validation("Resolution is required for image_to_video")
                })?;
                let img_base64 = non_empty(self.img_base64).ok_or_else(|| {
                    ModelError::validation("img_base64 is required for image_to_video")
                })?;
                Ok(GenerationRequest::ImageToVideo {
                    prompt: self.prompt,
                    negative_prompt,
                    resolution,
                    img_base64,
                })
            }
        }
    }
}

/// Job creation request that goes through prompt refinement first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RefinedJobRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "role, action, and size are required"))]
    pub role: String,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "role, action, and size are required"))]
    pub action: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "role, action, and size are required"))]
    pub size: String,
}

impl RefinedJobRequest {
    pub fn check(&self) -> ModelResult<()> {
        self.validate().map_err(first_message)
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Role description handed to the refinement model.
    pub fn role_info(&self) -> String {
        match self.source() {
            Some(source) => format!("{} (from {})", self.role, source),
            None => self.role.clone(),
        }
    }

    /// Prompt submitted to the provider once the role has been refined.
    pub fn compose_prompt(&self, refined_description: &str) -> String {
        format!(
            "Character: {}. Description: {}. Action: {}.",
            self.role_info(),
            refined_description,
            self.action
        )
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn first_message(errors: ValidationErrors) -> ModelError {
    let message = errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string());
    ModelError::Validation(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_request() -> CreateJobRequest {
        CreateJobRequest {
            kind: "text_to_video".into(),
            prompt: "a cat waving".into(),
            size: Some("1280*720".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_text_request() {
        let req = text_request().into_generation_request().unwrap();
        assert_eq!(req.kind(), GenerationKind::TextToVideo);
        assert_eq!(req.prompt(), "a cat waving");
        assert!(req.negative_prompt().is_none());
    }

    #[test]
    fn test_rejects_unknown_type() {
        let req = CreateJobRequest {
            kind: "video_to_video".into(),
            ..text_request()
        };
        let err = req.into_generation_request().unwrap_err();
        assert!(err.to_string().contains("Invalid type"));
    }

    #[test]
    fn test_rejects_missing_prompt() {
        let req = CreateJobRequest {
            prompt: String::new(),
            ..text_request()
        };
        assert_eq!(
            req.into_generation_request().unwrap_err(),
            ModelError::validation("Prompt is required")
        );
    }

    #[test]
    fn test_text_requires_size() {
        let req = CreateJobRequest {
            size: Some("  ".into()),
            ..text_request()
        };
        assert_eq!(
            req.into_generation_request().unwrap_err(),
            ModelError::validation("Size is required for text_to_video")
        );
    }

    #[test]
    fn test_image_requires_source_image() {
        let req = CreateJobRequest {
            kind: "image_to_video".into(),
            prompt: "make it dance".into(),
            resolution: Some("480P".into()),
            ..Default::default()
        };
        assert_eq!(
            req.into_generation_request().unwrap_err(),
            ModelError::validation("img_base64 is required for image_to_video")
        );
    }

    #[test]
    fn test_image_requires_resolution() {
        let req = CreateJobRequest {
            kind: "image_to_video".into(),
            prompt: "make it dance".into(),
            img_base64: Some("data:image/png;base64,AAAA".into()),
            ..Default::default()
        };
        assert_eq!(
            req.into_generation_request().unwrap_err(),
            ModelError::validation("Resolution is required for image_to_video")
        );
    }

    #[test]
    fn test_deserializes_type_field() {
        let req: CreateJobRequest = serde_json::from_str(
            r#"{"type":"image_to_video","prompt":"p","resolution":"720P","img_base64":"AAAA","negative_prompt":""}"#,
        )
        .unwrap();
        let gen = req.into_generation_request().unwrap();
        assert_eq!(gen.kind(), GenerationKind::ImageToVideo);
        assert!(gen.negative_prompt().is_none());
    }

    #[test]
    fn test_refined_request_prompt() {
        let req = RefinedJobRequest {
            role: "Pikachu".into(),
            source: Some("Pokemon".into()),
            action: "waves hello".into(),
            size: "1280*720".into(),
        };
        req.check().unwrap();
        assert_eq!(req.role_info(), "Pikachu (from Pokemon)");
        assert_eq!(
            req.compose_prompt("small yellow mouse"),
            "Character: Pikachu (from Pokemon). Description: small yellow mouse. Action: waves hello."
        );
    }

    #[test]
    fn test_refined_request_requires_fields() {
        let req = RefinedJobRequest {
            role: "Pikachu".into(),
            source: Some(" ".into()),
            action: String::new(),
            size: "1280*720".into(),
        };
        assert_eq!(
            req.check().unwrap_err(),
            ModelError::validation("role, action, and size are required")
        );
        assert_eq!(req.role_info(), "Pikachu");
    }
}
