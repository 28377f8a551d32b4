//! Application state.

use std::sync::Arc;

use emoji_jobs::{JobOrchestrator, OrchestratorConfig};
use emoji_media::{GifPipeline, PipelineConfig};
use emoji_provider::{DashScopeClient, DashScopeRefiner, PromptRefiner, ProviderConfig};
use emoji_store::FileJobStore;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: JobOrchestrator,
}

impl AppState {
    /// Wire the file store, provider, refiner and GIF pipeline from the environment.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = FileJobStore::open(&config.tasks_dir).await?;

        let provider_config = ProviderConfig::from_env()?;
        let provider = DashScopeClient::new(provider_config.clone())?;
        let refiner = DashScopeRefiner::new(provider_config)?;

        let mut pipeline_config = PipelineConfig::from_env();
        pipeline_config.tasks_dir = config.tasks_dir.clone();
        let pipeline = GifPipeline::new(pipeline_config)?;

        let orchestrator = JobOrchestrator::new(
            Arc::new(store),
            Arc::new(provider),
            Some(Arc::new(refiner) as Arc<dyn PromptRefiner>),
            Arc::new(pipeline),
            OrchestratorConfig::from_env(),
        );

        Ok(Self::from_parts(config, orchestrator))
    }

    /// Build state around an existing orchestrator.
    pub fn from_parts(config: ApiConfig, orchestrator: JobOrchestrator) -> Self {
        Self {
            config,
            orchestrator,
        }
    }
}
