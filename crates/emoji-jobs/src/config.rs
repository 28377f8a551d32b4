//! Orchestrator configuration.

use std::time::Duration;

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Extra poll attempts before a poll failure fails the job
    pub poll_retries: u32,
    /// Base delay of the poll retry backoff
    pub poll_retry_base_delay: Duration,
    /// Submit the unrefined role info when refinement fails
    pub refinement_fallback: bool,
    /// How long shutdown waits for in-flight submissions
    pub shutdown_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_retries: 0,
            poll_retry_base_delay: Duration::from_millis(500),
            refinement_fallback: false,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl OrchestratorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_retries: std::env::var("POLL_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.poll_retries),
            poll_retry_base_delay: defaults.poll_retry_base_delay,
            refinement_fallback: std::env::var("REFINEMENT_FALLBACK")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(defaults.refinement_fallback),
            shutdown_timeout: std::env::var("SHUTDOWN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
        }
    }
}
