//! Job store contract.

use async_trait::async_trait;

use emoji_models::{JobId, JobRecord};

use crate::error::StoreResult;

/// Durable mapping from job ID to job record.
///
/// Every call is atomic: readers never observe a partially written record.
/// There is no compare-and-swap; callers that need read-modify-write
/// semantics serialize per job themselves.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new record. Fails with `AlreadyExists` if the ID is taken.
    async fn create(&self, record: &JobRecord) -> StoreResult<()>;

    /// Persist a record, overwriting any previous version.
    async fn put(&self, record: &JobRecord) -> StoreResult<()>;

    /// Load a record, `None` if it does not exist.
    async fn get(&self, id: &JobId) -> StoreResult<Option<JobRecord>>;
}
