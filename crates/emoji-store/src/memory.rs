//! In-memory job store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use emoji_models::{JobId, JobRecord};

use crate::error::{StoreError, StoreResult};
use crate::store::JobStore;

/// Job store backed by a map. Records are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    records: RwLock<HashMap<JobId, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, record: &JobRecord) -> StoreResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id.to_string()));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn put(&self, record: &JobRecord) -> StoreResult<()> {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<JobRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }
}
