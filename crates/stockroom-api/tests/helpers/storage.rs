//! Test doubles for storage, the counter store, and the upload store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use stockroom_api::middleware::rate_limit::{RateLimitStore, RateLimitStoreError, WindowCount};
use stockroom_core::models::UploadRecord;
use stockroom_core::{AppError, StorageBackend};
use stockroom_db::{InMemoryUploadStore, UploadStore};
use stockroom_storage::{MemoryStorage, ObjectProbe, Storage, StorageResult, UploadGrant};
use uuid::Uuid;

/// In-memory storage that counts calls, for never-invoked assertions.
pub struct RecordingStorage {
    pub inner: MemoryStorage,
    grant_calls: AtomicUsize,
    probe_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self {
            inner: MemoryStorage::default(),
            grant_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    pub fn grant_calls(&self) -> usize {
        self.grant_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Simulate the client's direct PUT against the grant.
    pub async fn put_object(&self, key: &str, size: u64, content_type: &str) {
        self.inner.put_object(key, size, content_type).await;
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.inner.contains(key).await
    }
}

impl Default for RecordingStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn issue_upload_grant(
        &self,
        filename: &str,
        content_type: &str,
    ) -> StorageResult<UploadGrant> {
        self.grant_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.issue_upload_grant(filename, content_type).await
    }

    async fn probe_object(&self, key: &str) -> StorageResult<ObjectProbe> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.probe_object(key).await
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_object(key).await
    }

    fn public_url(&self, key: &str) -> String {
        self.inner.public_url(key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Upload store whose `mark_failed` always errors; everything else
/// delegates. Exercises the swallowed compensating write at confirm.
pub struct FailingMarkUploadStore {
    pub inner: InMemoryUploadStore,
}

impl FailingMarkUploadStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryUploadStore::new(),
        }
    }
}

#[async_trait]
impl UploadStore for FailingMarkUploadStore {
    async fn create_upload(&self, record: &UploadRecord) -> Result<(), AppError> {
        self.inner.create_upload(record).await
    }

    async fn get_upload(&self, id: Uuid) -> Result<Option<UploadRecord>, AppError> {
        self.inner.get_upload(id).await
    }

    async fn mark_completed(&self, id: Uuid, file_size: i64) -> Result<UploadRecord, AppError> {
        self.inner.mark_completed(id, file_size).await
    }

    async fn mark_failed(&self, _id: Uuid, _error_message: &str) -> Result<(), AppError> {
        Err(AppError::Internal("simulated metadata outage".to_string()))
    }

    async fn mark_deleted(&self, key: &str) -> Result<bool, AppError> {
        self.inner.mark_deleted(key).await
    }

    async fn find_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<UploadRecord>, AppError> {
        self.inner.find_stale_pending(cutoff).await
    }
}

/// Counter store whose every call fails; the limiter must fail open.
pub struct FailingRateLimitStore;

#[async_trait]
impl RateLimitStore for FailingRateLimitStore {
    async fn increment(
        &self,
        _key: &str,
        _window: chrono::Duration,
    ) -> Result<WindowCount, RateLimitStoreError> {
        Err(RateLimitStoreError("simulated store outage".to_string()))
    }

    async fn sweep_expired(&self) -> Result<usize, RateLimitStoreError> {
        Err(RateLimitStoreError("simulated store outage".to_string()))
    }
}
