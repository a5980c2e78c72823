//! Storage abstraction trait
//!
//! The gateway never transfers file bytes itself: uploads happen directly
//! between the client and the object store via the presigned grant.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stockroom_core::StorageBackend;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to issue upload grant: {0}")]
    GrantFailed(String),

    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A time-boxed authorization for one direct PUT to a specific key.
#[derive(Debug, Clone)]
pub struct UploadGrant {
    pub key: String,
    pub upload_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of a non-mutating existence/metadata check.
///
/// Absence is a normal outcome (`exists: false`), distinct from transport or
/// auth failures, which surface as `StorageError`.
#[derive(Debug, Clone, Default)]
pub struct ObjectProbe {
    pub exists: bool,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

impl ObjectProbe {
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Object store gateway.
///
/// All backends must implement this trait; the lifecycle handlers and the
/// orphan reconciler work against it without knowing the backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Generate a globally-unique key for the filename and return a
    /// presigned PUT URL for it. The transfer itself happens out-of-band.
    async fn issue_upload_grant(
        &self,
        filename: &str,
        content_type: &str,
    ) -> StorageResult<UploadGrant>;

    /// Check whether an object exists and fetch its metadata.
    async fn probe_object(&self, key: &str) -> StorageResult<ObjectProbe>;

    /// Delete an object. Idempotent-intent: deleting an absent key succeeds.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// Public URL for a confirmed object, computed from bucket/region/key.
    fn public_url(&self, key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
