//! Per-job async locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

use emoji_models::JobId;

/// One async mutex per job ID.
///
/// Every read-modify-write of a job record happens under its guard, so the
/// background submission and concurrent queries never overwrite each
/// other's changes. Entries are dropped once no task holds or waits on them.
#[derive(Debug, Default)]
pub struct JobLocks {
    locks: Mutex<HashMap<JobId, Arc<tokio::sync::Mutex<()>>>>,
}

impl JobLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    pub async fn acquire(&self, id: &JobId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of jobs with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_job_is_exclusive() {
        let locks = Arc::new(JobLocks::new());
        let id = JobId::new();

        let guard = locks.acquire(&id).await;
        let contender = {
            let locks = locks.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_jobs_do_not_block() {
        let locks = JobLocks::new();
        let _a = locks.acquire(&JobId::new()).await;
        let _b = locks.acquire(&JobId::new()).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = JobLocks::new();
        drop(locks.acquire(&JobId::new()).await);
        drop(locks.acquire(&JobId::new()).await);
        // Pruning happens on the next acquire.
        let _guard = locks.acquire(&JobId::new()).await;
        assert_eq!(locks.len(), 1);
    }
}
