//! Provider error types.

use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while talking to the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to submit generation task: {0}")]
    Submission(String),

    #[error("Failed to query generation task: {0}")]
    Query(String),

    #[error("Prompt refinement failed: {0}")]
    Refinement(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn refinement(msg: impl Into<String>) -> Self {
        Self::Refinement(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
