//! Provider client configuration.

use std::time::Duration;

use url::Url;

use crate::error::{ProviderError, ProviderResult};

const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com";

/// Provider client configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API key sent as a bearer token
    pub api_key: String,
    /// Base URL of the provider API (no trailing slash)
    pub base_url: String,
    /// Model used for text-to-video tasks
    pub text_to_video_model: String,
    /// Model used for image-to-video tasks
    pub image_to_video_model: String,
    /// Chat model used for prompt refinement
    pub refinement_model: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl ProviderConfig {
    /// Create a config with defaults for everything except the credentials.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            text_to_video_model: "wanx2.1-t2v-turbo".to_string(),
            image_to_video_model: "wan2.2-i2v-flash".to_string(),
            refinement_model: "qwen-flash".to_string(),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = std::env::var("DASHSCOPE_API_KEY")
            .map_err(|_| ProviderError::config("DASHSCOPE_API_KEY must be set"))?;
        if api_key.trim().is_empty() {
            return Err(ProviderError::config("DASHSCOPE_API_KEY cannot be empty"));
        }

        let base_url =
            std::env::var("DASHSCOPE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Url::parse(&base_url).map_err(|e| {
            ProviderError::config(format!("Invalid DASHSCOPE_BASE_URL '{}': {}", base_url, e))
        })?;
        let mut config = Self::new(api_key, base_url);

        if let Ok(model) = std::env::var("PROVIDER_T2V_MODEL") {
            config.text_to_video_model = model;
        }
        if let Ok(model) = std::env::var("PROVIDER_I2V_MODEL") {
            config.image_to_video_model = model;
        }
        if let Ok(model) = std::env::var("REFINEMENT_MODEL") {
            config.refinement_model = model;
        }
        config.timeout = Duration::from_secs(
            std::env::var("PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = ProviderConfig::new("key", "http://localhost:1234/");
        assert_eq!(config.base_url, "http://localhost:1234");
        assert_eq!(config.text_to_video_model, "wanx2.1-t2v-turbo");
        assert_eq!(config.image_to_video_model, "wan2.2-i2v-flash");
    }
}
