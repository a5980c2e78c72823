//! In-memory metadata stores, used by tests and single-process dev runs.
//!
//! These implement the same guarded transitions as the Postgres stores so
//! lifecycle semantics can be exercised without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use stockroom_core::models::{ProductImageRecord, ProductRecord, UploadRecord, UploadStatus};
use stockroom_core::AppError;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::traits::{CatalogStore, UploadStore};

#[derive(Default)]
pub struct InMemoryUploadStore {
    records: Mutex<HashMap<Uuid, UploadRecord>>,
}

impl InMemoryUploadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot a record for test assertions.
    pub async fn get(&self, id: Uuid) -> Option<UploadRecord> {
        self.records.lock().await.get(&id).cloned()
    }

    /// Snapshot the record holding a given key.
    pub async fn get_by_key(&self, key: &str) -> Option<UploadRecord> {
        self.records
            .lock()
            .await
            .values()
            .find(|r| r.key == key)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Insert a record verbatim, bypassing lifecycle checks. Test seeding only.
    pub async fn seed(&self, record: UploadRecord) {
        self.records.lock().await.insert(record.id, record);
    }
}

#[async_trait]
impl UploadStore for InMemoryUploadStore {
    async fn create_upload(&self, record: &UploadRecord) -> Result<(), AppError> {
        let mut records = self.records.lock().await;
        if records.values().any(|r| r.key == record.key) {
            return Err(AppError::InvalidState(format!(
                "upload record for key {} already exists",
                record.key
            )));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_upload(&self, id: Uuid) -> Result<Option<UploadRecord>, AppError> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn mark_completed(&self, id: Uuid, file_size: i64) -> Result<UploadRecord, AppError> {
        let mut records = self.records.lock().await;
        let record = records.get_mut(&id).filter(|r| r.status == UploadStatus::Pending);
        match record {
            Some(record) => {
                record.status = UploadStatus::Completed;
                record.file_size = file_size;
                record.updated_at = Utc::now();
                Ok(record.clone())
            }
            None => Err(AppError::InvalidState(format!(
                "upload {} is not pending and cannot be completed",
                id
            ))),
        }
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<(), AppError> {
        let mut records = self.records.lock().await;
        let record = records.get_mut(&id).filter(|r| r.status == UploadStatus::Pending);
        match record {
            Some(record) => {
                record.status = UploadStatus::Failed;
                record.error_message = Some(error_message.to_string());
                record.updated_at = Utc::now();
                Ok(())
            }
            None => Err(AppError::InvalidState(format!(
                "upload {} is not pending and cannot be failed",
                id
            ))),
        }
    }

    async fn mark_deleted(&self, key: &str) -> Result<bool, AppError> {
        let mut records = self.records.lock().await;
        let record = records.values_mut().find(|r| {
            r.key == key
                && matches!(r.status, UploadStatus::Pending | UploadStatus::Completed)
        });
        match record {
            Some(record) => {
                record.status = UploadStatus::Deleted;
                record.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<UploadRecord>, AppError> {
        let records = self.records.lock().await;
        let mut stale: Vec<UploadRecord> = records
            .values()
            .filter(|r| r.status == UploadStatus::Pending && r.created_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|r| r.created_at);
        Ok(stale)
    }
}

#[derive(Default)]
pub struct InMemoryCatalogStore {
    products: Mutex<HashMap<Uuid, ProductRecord>>,
    images: Mutex<Vec<ProductImageRecord>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a product owned by `owner_id`, returning its id. Test seeding.
    pub async fn add_product(&self, owner_id: Uuid, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.products.lock().await.insert(
            id,
            ProductRecord {
                id,
                owner_id,
                name: name.to_string(),
                created_at: Utc::now(),
            },
        );
        id
    }

    pub async fn image_count(&self, product_id: Uuid, key: &str) -> usize {
        self.images
            .lock()
            .await
            .iter()
            .filter(|i| i.product_id == product_id && i.object_key == key)
            .count()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn get_product_owner(&self, product_id: Uuid) -> Result<Option<Uuid>, AppError> {
        Ok(self
            .products
            .lock()
            .await
            .get(&product_id)
            .map(|p| p.owner_id))
    }

    async fn find_owned_image(
        &self,
        user_id: Uuid,
        key: &str,
        product_id: Uuid,
    ) -> Result<Option<ProductImageRecord>, AppError> {
        let products = self.products.lock().await;
        let owned = products
            .get(&product_id)
            .map(|p| p.owner_id == user_id)
            .unwrap_or(false);
        if !owned {
            return Ok(None);
        }

        Ok(self
            .images
            .lock()
            .await
            .iter()
            .find(|i| i.product_id == product_id && i.object_key == key)
            .cloned())
    }

    async fn insert_product_image(&self, product_id: Uuid, key: &str) -> Result<(), AppError> {
        let mut images = self.images.lock().await;
        if images
            .iter()
            .any(|i| i.product_id == product_id && i.object_key == key)
        {
            return Ok(());
        }
        images.push(ProductImageRecord {
            id: Uuid::new_v4(),
            product_id,
            object_key: key.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn delete_product_images(&self, product_id: Uuid, key: &str) -> Result<u64, AppError> {
        let mut images = self.images.lock().await;
        let before = images.len();
        images.retain(|i| !(i.product_id == product_id && i.object_key == key));
        Ok((before - images.len()) as u64)
    }
}
