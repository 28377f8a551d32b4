//! API error types.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use emoji_jobs::JobError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Detail shown instead of a sensitive error message in production.
pub const MASKED_DETAIL: &str = "An internal error occurred";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Job(#[from] JobError),
}

/// Response extension marking a detail that may leak server internals.
#[derive(Debug, Clone, Copy)]
pub struct SensitiveDetail;

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Job(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Job(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Store failures can carry file paths.
    fn is_sensitive(&self) -> bool {
        matches!(self, ApiError::Job(JobError::Store(_)))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let sensitive = self.is_sensitive();

        let mut response = (
            status,
            Json(ErrorResponse {
                detail: self.to_string(),
            }),
        )
            .into_response();
        if sensitive {
            response.extensions_mut().insert(SensitiveDetail);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emoji_provider::ProviderError;
    use emoji_store::StoreError;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::from(JobError::validation("Prompt is required")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(JobError::Refinement(ProviderError::refinement("down"))).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_errors_are_marked_sensitive() {
        let response =
            ApiError::from(JobError::Store(StoreError::internal("/srv/tasks"))).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<SensitiveDetail>().is_some());

        let response = ApiError::BadRequest("bad".to_string()).into_response();
        assert!(response.extensions().get::<SensitiveDetail>().is_none());
    }
}
