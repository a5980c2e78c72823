//! Orphaned upload reconciliation.
//!
//! An upload record that stays `pending` past the staleness threshold is an
//! orphan: its grant was issued but the client never confirmed. The sweep
//! deletes the stored object first, then marks the record deleted, same
//! order as a user-requested delete. A failure on one record never stops
//! the rest of the sweep.

use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use stockroom_core::AppError;
use stockroom_db::UploadStore;
use stockroom_storage::Storage;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// One record the sweep could not reconcile, with the error it hit.
#[derive(Debug, Clone, Serialize)]
pub struct SweepFailure {
    pub key: String,
    pub error: String,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepSummary {
    pub deleted: usize,
    pub failed_keys: Vec<String>,
    pub failures: Vec<SweepFailure>,
}

pub struct OrphanReconciler {
    uploads: Arc<dyn UploadStore>,
    storage: Arc<dyn Storage>,
    threshold: Duration,
}

impl OrphanReconciler {
    pub fn new(
        uploads: Arc<dyn UploadStore>,
        storage: Arc<dyn Storage>,
        threshold: Duration,
    ) -> Self {
        Self {
            uploads,
            storage,
            threshold,
        }
    }

    /// Run one reconciliation pass over all stale pending records.
    ///
    /// Only the initial stale query can fail the pass as a whole; per-record
    /// errors are collected into the summary and the pass continues.
    pub async fn sweep(&self) -> Result<SweepSummary, AppError> {
        let cutoff = Utc::now() - self.threshold;
        let stale = self.uploads.find_stale_pending(cutoff).await?;

        if stale.is_empty() {
            return Ok(SweepSummary::default());
        }

        info!(count = stale.len(), "Reconciling stale pending uploads");

        let mut summary = SweepSummary::default();
        for record in stale {
            match self.reconcile_one(&record.key).await {
                Ok(()) => summary.deleted += 1,
                Err(err) => {
                    warn!(key = %record.key, error = %err, "Failed to reconcile orphaned upload");
                    summary.failed_keys.push(record.key.clone());
                    summary.failures.push(SweepFailure {
                        key: record.key,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            deleted = summary.deleted,
            failed = summary.failures.len(),
            "Reconciliation pass complete"
        );
        Ok(summary)
    }

    async fn reconcile_one(&self, key: &str) -> Result<(), AppError> {
        // Storage first: if this fails the record stays pending and the next
        // pass retries it.
        self.storage
            .delete_object(key)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        self.uploads.mark_deleted(key).await?;
        Ok(())
    }

    /// Spawn the periodic sweep loop.
    pub fn start(self: Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        info!(interval_secs = every.as_secs(), "Starting orphan reconciler");
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick fires immediately; skip it so startup stays quiet.
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(err) = self.sweep().await {
                    error!(error = %err, "Reconciliation pass failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stockroom_core::models::{UploadRecord, UploadStatus};
    use stockroom_core::StorageBackend;
    use stockroom_db::InMemoryUploadStore;
    use stockroom_storage::{MemoryStorage, ObjectProbe, StorageResult, UploadGrant};
    use uuid::Uuid;

    /// Delegates to in-memory storage but fails deletes for one key.
    struct FailingStorage {
        inner: MemoryStorage,
        poisoned_key: String,
    }

    #[async_trait]
    impl Storage for FailingStorage {
        async fn issue_upload_grant(
            &self,
            filename: &str,
            content_type: &str,
        ) -> StorageResult<UploadGrant> {
            self.inner.issue_upload_grant(filename, content_type).await
        }

        async fn probe_object(&self, key: &str) -> StorageResult<ObjectProbe> {
            self.inner.probe_object(key).await
        }

        async fn delete_object(&self, key: &str) -> StorageResult<()> {
            if key == self.poisoned_key {
                return Err(stockroom_storage::StorageError::DeleteFailed(
                    "simulated outage".to_string(),
                ));
            }
            self.inner.delete_object(key).await
        }

        fn public_url(&self, key: &str) -> String {
            self.inner.public_url(key)
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Memory
        }
    }

    fn stale_record(key: &str) -> UploadRecord {
        let mut record = UploadRecord::new_pending(
            key.to_string(),
            "cat.png".to_string(),
            "image/png".to_string(),
            1024,
            Uuid::new_v4(),
            None,
        );
        record.created_at = Utc::now() - Duration::hours(25);
        record
    }

    #[tokio::test]
    async fn test_sweep_deletes_stale_pending_only() {
        let uploads = Arc::new(InMemoryUploadStore::new());
        let storage = Arc::new(MemoryStorage::default());

        let stale = stale_record("assets/a/stale.png");
        storage.put_object(&stale.key, 1024, "image/png").await;
        uploads.seed(stale.clone()).await;

        // Fresh pending record is left alone.
        let fresh = UploadRecord::new_pending(
            "assets/b/fresh.png".to_string(),
            "fresh.png".to_string(),
            "image/png".to_string(),
            512,
            Uuid::new_v4(),
            None,
        );
        uploads.seed(fresh.clone()).await;

        let reconciler =
            OrphanReconciler::new(uploads.clone(), storage.clone(), Duration::hours(24));
        let summary = reconciler.sweep().await.unwrap();

        assert_eq!(summary.deleted, 1);
        assert!(summary.failures.is_empty());
        assert!(!storage.contains(&stale.key).await);
        assert_eq!(
            uploads.get(stale.id).await.unwrap().status,
            UploadStatus::Deleted
        );
        assert_eq!(
            uploads.get(fresh.id).await.unwrap().status,
            UploadStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_sweep_isolates_per_record_failures() {
        let uploads = Arc::new(InMemoryUploadStore::new());
        let poisoned = stale_record("assets/p/poisoned.png");
        let ok_a = stale_record("assets/a/a.png");
        let ok_b = stale_record("assets/b/b.png");
        uploads.seed(poisoned.clone()).await;
        uploads.seed(ok_a.clone()).await;
        uploads.seed(ok_b.clone()).await;

        let storage = Arc::new(FailingStorage {
            inner: MemoryStorage::default(),
            poisoned_key: poisoned.key.clone(),
        });

        let reconciler =
            OrphanReconciler::new(uploads.clone(), storage, Duration::hours(24));
        let summary = reconciler.sweep().await.unwrap();

        assert_eq!(summary.deleted, 2);
        assert_eq!(summary.failed_keys, vec![poisoned.key.clone()]);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].error.contains("simulated outage"));

        // The failed record stays pending and will be retried next pass.
        assert_eq!(
            uploads.get(poisoned.id).await.unwrap().status,
            UploadStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_sweep_with_nothing_stale_is_empty() {
        let uploads = Arc::new(InMemoryUploadStore::new());
        let storage = Arc::new(MemoryStorage::default());
        let reconciler = OrphanReconciler::new(uploads, storage, Duration::hours(24));

        let summary = reconciler.sweep().await.unwrap();
        assert_eq!(summary.deleted, 0);
        assert!(summary.failed_keys.is_empty());
    }
}
