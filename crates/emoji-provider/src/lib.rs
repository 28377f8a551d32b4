//! Client for the asynchronous video generation provider.
//!
//! This crate provides:
//! - [`GenerationProvider`]: submit text/image-to-video tasks and poll them
//! - [`PromptRefiner`]: rewrite a role description through a chat model
//! - DashScope-compatible implementations of both

pub mod client;
pub mod config;
pub mod error;
pub mod refine;
mod wire;

pub use client::{DashScopeClient, GenerationProvider};
pub use config::ProviderConfig;
pub use error::{ProviderError, ProviderResult};
pub use refine::{DashScopeRefiner, PromptRefiner, ROLE_SYSTEM_PROMPT};
