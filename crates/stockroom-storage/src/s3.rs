use crate::keys::build_object_key;
use crate::traits::{ObjectProbe, Storage, StorageError, StorageResult, UploadGrant};
use async_trait::async_trait;
use chrono::Utc;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::ObjectStore;
use std::time::Duration;
use stockroom_core::StorageBackend;

/// S3 storage gateway
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    grant_ttl: Duration,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `grant_ttl` - Lifetime of issued upload grants
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        grant_ttl: Duration,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
            grant_ttl,
        })
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn issue_upload_grant(
        &self,
        filename: &str,
        _content_type: &str,
    ) -> StorageResult<UploadGrant> {
        let key = build_object_key(filename);
        let location = Path::from(key.clone());
        let start = std::time::Instant::now();

        let url = self
            .store
            .signed_url(Method::PUT, &location, self.grant_ttl)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "Failed to sign upload URL"
                );
                StorageError::GrantFailed(e.to_string())
            })?;

        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.grant_ttl)
                .unwrap_or_else(|_| chrono::Duration::seconds(3600));

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            ttl_secs = self.grant_ttl.as_secs(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Issued upload grant"
        );

        Ok(UploadGrant {
            key,
            upload_url: url.to_string(),
            expires_at,
        })
    }

    async fn probe_object(&self, key: &str) -> StorageResult<ObjectProbe> {
        let location = Path::from(key.to_string());
        match self.store.head(&location).await {
            Ok(meta) => Ok(ObjectProbe {
                exists: true,
                // head() does not expose content type; the record keeps the
                // validated type from initiation.
                content_type: None,
                size: Some(meta.size),
                last_modified: Some(meta.last_modified),
                etag: meta.e_tag.clone(),
            }),
            Err(ObjectStoreError::NotFound { .. }) => Ok(ObjectProbe::absent()),
            Err(e) => Err(StorageError::ProbeFailed(e.to_string())),
        }
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        match self.store.delete(&location).await {
            Ok(()) => {}
            // Deleting an absent key is success: callers must not be able to
            // distinguish it.
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::debug!(bucket = %self.bucket, key = %key, "Delete of absent object");
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    /// Public URL for an object.
    ///
    /// S3-compatible providers behind a custom endpoint get path-style URLs:
    /// `{endpoint}/{bucket}/{key}`. AWS proper gets virtual-hosted style.
    fn public_url(&self, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
