//! Orchestrator error types.

use thiserror::Error;

use emoji_models::ModelError;
use emoji_provider::ProviderError;
use emoji_store::StoreError;

/// Result type for orchestrator operations.
pub type JobResult<T> = Result<T, JobError>;

/// Errors returned synchronously to callers of the orchestrator.
///
/// Provider and pipeline failures after creation never surface here; they
/// are written into the job record instead.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid job ID format: {0}")]
    InvalidJobId(String),

    #[error(transparent)]
    Refinement(#[from] ProviderError),

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),
}

impl JobError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether the caller sent a malformed request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, JobError::Validation(_) | JobError::InvalidJobId(_))
    }
}

impl From<ModelError> for JobError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Validation(msg) => JobError::Validation(msg),
            ModelError::InvalidJobId(id) => JobError::InvalidJobId(id),
        }
    }
}
