use crate::{MemoryStorage, S3Storage, Storage, StorageError, StorageResult};
use std::sync::Arc;
use stockroom_core::{Config, StorageBackend};

/// Create a storage backend based on configuration.
///
/// Required settings are checked here, before any network call, so a
/// misconfigured deployment fails with a configuration error rather than a
/// runtime storage error.
pub fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend {
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config.s3_region.clone().ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;
            let endpoint = config.s3_endpoint.clone();

            let storage = S3Storage::new(bucket, region, endpoint, config.upload_grant_ttl())?;
            Ok(Arc::new(storage))
        }
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new(config.upload_grant_ttl()))),
    }
}
