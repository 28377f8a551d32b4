//! API middleware.

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, Request, Response};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::Json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::{ErrorResponse, SensitiveDetail, MASKED_DETAIL};

/// Create CORS layer.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        // Wildcard origin: no credentials, so Any is allowed everywhere
        return CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_origin(Any)
            .max_age(Duration::from_secs(600));
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
        ])
        .allow_credentials(true)
        .allow_origin(origins)
        .max_age(Duration::from_secs(600))
}

/// Request ID middleware.
pub async fn request_id(mut request: Request<Body>, next: Next) -> Response<Body> {
    let request_id = request
        .headers()
        .get("X-Request-ID")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("X-Request-ID", value);
    }

    response
}

/// Request logging middleware.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    // Health probes and GIF fetches are too chatty to log
    let path = uri.path();
    if path != "/health" && path != "/" && !path.starts_with("/tasks/") {
        info!(
            method = %method,
            uri = %uri,
            status = %response.status(),
            duration_ms = %start.elapsed().as_millis(),
            "Request completed"
        );
    }

    response
}

/// Replace sensitive error details with a generic message in production.
pub async fn mask_internal_errors(
    State(config): State<ApiConfig>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let response = next.run(request).await;
    if !config.is_production() || response.extensions().get::<SensitiveDetail>().is_none() {
        return response;
    }

    warn!(status = %response.status(), "Masking internal error detail");
    let status = response.status();
    (
        status,
        Json(ErrorResponse {
            detail: MASKED_DETAIL.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;
    use emoji_jobs::JobError;
    use emoji_store::StoreError;
    use tower::ServiceExt;

    use crate::error::ApiError;

    async fn failing_store() -> Result<(), ApiError> {
        Err(JobError::Store(StoreError::internal("/srv/tasks/job_1.json")).into())
    }

    async fn detail_for(environment: &str) -> String {
        let config = ApiConfig {
            environment: environment.to_string(),
            ..Default::default()
        };
        let app = Router::new()
            .route("/", get(failing_store))
            .layer(axum::middleware::from_fn_with_state(config, mask_internal_errors));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["detail"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_store_detail_masked_in_production() {
        assert_eq!(detail_for("Production").await, MASKED_DETAIL);
        assert!(detail_for("development").await.contains("/srv/tasks"));
    }
}
