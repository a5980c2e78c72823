use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stockroom_core::models::{ProductImageRecord, UploadRecord};
use stockroom_core::AppError;
use uuid::Uuid;

/// Store for upload lifecycle records.
///
/// Status transitions are guarded at this level: `mark_completed` and
/// `mark_failed` only move a PENDING record, `mark_deleted` only a PENDING
/// or COMPLETED one. A blocked transition surfaces as `AppError::InvalidState`
/// (or, for delete, an unchanged-row result), never as a silent overwrite.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Persist a freshly-initiated PENDING record.
    async fn create_upload(&self, record: &UploadRecord) -> Result<(), AppError>;

    async fn get_upload(&self, id: Uuid) -> Result<Option<UploadRecord>, AppError>;

    /// PENDING -> COMPLETED, overwriting `file_size` with the store-reported
    /// authoritative size. Returns the updated record.
    async fn mark_completed(&self, id: Uuid, file_size: i64) -> Result<UploadRecord, AppError>;

    /// PENDING -> FAILED with an error note. Used as the best-effort
    /// compensating write on the confirm error path.
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<(), AppError>;

    /// {PENDING, COMPLETED} -> DELETED by storage key. Returns whether a row
    /// actually transitioned; an already-terminal record is not an error.
    async fn mark_deleted(&self, key: &str) -> Result<bool, AppError>;

    /// PENDING records created before `cutoff`, i.e. initiations whose
    /// confirm never happened.
    async fn find_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<UploadRecord>, AppError>;
}

/// Read/write access to products and product-image associations.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_product_owner(&self, product_id: Uuid) -> Result<Option<Uuid>, AppError>;

    /// Image row matching the storage key whose parent product has the given
    /// id and owner. This is the transitive ownership lookup: authorization
    /// flows through the product, not the image row itself.
    async fn find_owned_image(
        &self,
        user_id: Uuid,
        key: &str,
        product_id: Uuid,
    ) -> Result<Option<ProductImageRecord>, AppError>;

    async fn insert_product_image(&self, product_id: Uuid, key: &str) -> Result<(), AppError>;

    /// Remove image rows referencing the key for the product. Returns the
    /// number of rows removed.
    async fn delete_product_images(&self, product_id: Uuid, key: &str) -> Result<u64, AppError>;
}
