//! File-backed job store.
//!
//! One JSON document per job at `<root>/<job_id>.json`. Writes go through a
//! temporary file in the same directory and are renamed into place, so a
//! concurrent reader sees either the old or the new record.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use metrics::counter;
use tempfile::NamedTempFile;
use tracing::debug;

use emoji_models::{JobId, JobRecord};

use crate::error::{StoreError, StoreResult};
use crate::store::JobStore;

/// Job store persisting records as JSON files.
#[derive(Debug, Clone)]
pub struct FileJobStore {
    root: PathBuf,
}

impl FileJobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Path of the record for `id`.
    pub fn record_path(&self, id: &JobId) -> PathBuf {
        self.root.join(format!("{}.json", id.as_str()))
    }

    async fn write(&self, record: &JobRecord, clobber: bool) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(record)?;
        let root = self.root.clone();
        let path = self.record_path(&record.id);
        let id = record.id.to_string();

        tokio::task::spawn_blocking(move || -> StoreResult<()> {
            let mut tmp = NamedTempFile::new_in(&root)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;

            if clobber {
                tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
            } else {
                tmp.persist_noclobber(&path).map_err(|e| {
                    if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                        StoreError::AlreadyExists(id)
                    } else {
                        StoreError::Io(e.error)
                    }
                })?;
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::internal(format!("Store write task failed: {}", e)))?
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn create(&self, record: &JobRecord) -> StoreResult<()> {
        self.write(record, false).await?;
        counter!("emoji_store_writes_total", "op" => "create").increment(1);
        debug!(job_id = %record.id, status = %record.status, "Created job record");
        Ok(())
    }

    async fn put(&self, record: &JobRecord) -> StoreResult<()> {
        self.write(record, true).await?;
        counter!("emoji_store_writes_total", "op" => "put").increment(1);
        debug!(job_id = %record.id, status = %record.status, "Stored job record");
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<JobRecord>> {
        let bytes = match tokio::fs::read(self.record_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                id: id.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emoji_models::{GenerationRequest, JobStatus};
    use tempfile::TempDir;

    fn record() -> JobRecord {
        JobRecord::new(GenerationRequest::TextToVideo {
            prompt: "a cat waving".into(),
            negative_prompt: None,
            size: "1280*720".into(),
        })
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let dir = TempDir::new().unwrap();
        let store = FileJobStore::open(dir.path().join("tasks")).await.unwrap();
        let job = record();

        store.create(&job).await.unwrap();

        assert!(store.record_path(&job.id).exists());
        let loaded = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded, job);
    }

    #[tokio::test]
    async fn test_create_does_not_clobber() {
        let dir = TempDir::new().unwrap();
        let store = FileJobStore::open(dir.path()).await.unwrap();
        let job = record();

        store.create(&job).await.unwrap();
        let err = store.create(&job).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FileJobStore::open(dir.path()).await.unwrap();
        let mut job = record();
        store.create(&job).await.unwrap();

        job.mark_running();
        job.record_submission("h1");
        store.put(&job).await.unwrap();

        let loaded = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Running);
        assert_eq!(loaded.provider_task_id.as_deref(), Some("h1"));
    }

    #[tokio::test]
    async fn test_missing_record() {
        let dir = TempDir::new().unwrap();
        let store = FileJobStore::open(dir.path()).await.unwrap();
        assert!(store.get(&JobId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record() {
        let dir = TempDir::new().unwrap();
        let store = FileJobStore::open(dir.path()).await.unwrap();
        let id = JobId::new();
        std::fs::write(store.record_path(&id), b"{not json").unwrap();

        let err = store.get(&id).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = FileJobStore::open(dir.path()).await.unwrap();
        let job = record();
        store.create(&job).await.unwrap();
        store.put(&job).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
