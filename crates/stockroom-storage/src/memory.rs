//! In-memory storage backend for tests and single-process dev runs.
//!
//! Holds object metadata only; "uploads" are simulated by seeding entries
//! with [`MemoryStorage::put_object`]. Grant URLs point at a non-routable
//! host since no real transfer happens in this mode.

use crate::keys::build_object_key;
use crate::traits::{ObjectProbe, Storage, StorageResult, UploadGrant};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use stockroom_core::StorageBackend;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredEntry {
    size: u64,
    content_type: String,
    last_modified: DateTime<Utc>,
    etag: String,
}

pub struct MemoryStorage {
    objects: Mutex<HashMap<String, StoredEntry>>,
    base_url: String,
    grant_ttl: Duration,
}

impl MemoryStorage {
    pub fn new(grant_ttl: Duration) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            base_url: "http://stockroom-memory.invalid".to_string(),
            grant_ttl,
        }
    }

    /// Simulate a completed direct PUT for `key`.
    pub async fn put_object(&self, key: &str, size: u64, content_type: &str) {
        self.objects.lock().await.insert(
            key.to_string(),
            StoredEntry {
                size,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
                etag: format!("\"{}\"", Uuid::new_v4().simple()),
            },
        );
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.lock().await.contains_key(key)
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn issue_upload_grant(
        &self,
        filename: &str,
        _content_type: &str,
    ) -> StorageResult<UploadGrant> {
        let key = build_object_key(filename);
        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.grant_ttl)
                .unwrap_or_else(|_| chrono::Duration::seconds(3600));
        let upload_url = format!(
            "{}/{}?expires={}",
            self.base_url,
            key,
            expires_at.timestamp()
        );
        Ok(UploadGrant {
            key,
            upload_url,
            expires_at,
        })
    }

    async fn probe_object(&self, key: &str) -> StorageResult<ObjectProbe> {
        let objects = self.objects.lock().await;
        Ok(match objects.get(key) {
            Some(entry) => ObjectProbe {
                exists: true,
                content_type: Some(entry.content_type.clone()),
                size: Some(entry.size),
                last_modified: Some(entry.last_modified),
                etag: Some(entry.etag.clone()),
            },
            None => ObjectProbe::absent(),
        })
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        // Removing an absent key is success, matching object-store semantics.
        self.objects.lock().await.remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
