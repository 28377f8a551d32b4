//! Durable job record store.
//!
//! This crate provides:
//! - The [`JobStore`] contract (create, read, full-record overwrite)
//! - A file-backed store with one JSON document per job
//! - An in-memory store for tests and ephemeral deployments

pub mod error;
pub mod file;
pub mod memory;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use file::FileJobStore;
pub use memory::MemoryJobStore;
pub use store::JobStore;
