//! Shared data models for the Emoji Maker backend.
//!
//! This crate provides Serde-serializable types for:
//! - Job records and their status state machine
//! - Generation requests and creation-request validation
//! - Provider-side task status

pub mod error;
pub mod job;
pub mod provider;
pub mod request;

// Re-export common types
pub use error::{ModelError, ModelResult};
pub use job::{JobId, JobRecord, JobStatus, RefinementOrigin};
pub use provider::{ProviderState, ProviderStatus, GENERIC_PROVIDER_FAILURE};
pub use request::{CreateJobRequest, GenerationKind, GenerationRequest, RefinedJobRequest};
