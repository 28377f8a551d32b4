//! Job orchestration for the Emoji Maker backend.
//!
//! This crate provides:
//! - [`JobOrchestrator`]: job creation, background submission, status
//!   reconciliation against the provider and the success-path pipeline
//! - Per-job serialization of record mutations ([`JobLocks`])
//! - A [`Supervisor`] that records crashed background submissions
//! - Retry and metrics helpers

pub mod config;
pub mod error;
pub mod locks;
pub mod metrics;
pub mod orchestrator;
pub mod retry;
pub mod supervisor;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::OrchestratorConfig;
pub use error::{JobError, JobResult};
pub use locks::JobLocks;
pub use orchestrator::{JobOrchestrator, JobStatusReport};
pub use retry::{retry_async, RetryConfig, RetryResult};
pub use supervisor::Supervisor;
