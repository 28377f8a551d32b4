//! Axum HTTP API server.
//!
//! This crate provides:
//! - Video job creation (JSON or form bodies) and status endpoints
//! - Static serving of the tasks directory (records and GIFs)
//! - Request logging, CORS and body limits
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
