//! Postgres implementations of the metadata stores.
//!
//! Queries are runtime sqlx (`query` / `query_as` with `.bind()`), not the
//! compile-time checked macros, so builds never require `DATABASE_URL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::Row;
use stockroom_core::models::{ProductImageRecord, UploadRecord, UploadStatus};
use stockroom_core::AppError;
use uuid::Uuid;

use crate::traits::{CatalogStore, UploadStore};

#[derive(Clone)]
pub struct PgUploadStore {
    pool: PgPool,
}

impl PgUploadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadStore for PgUploadStore {
    async fn create_upload(&self, record: &UploadRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO upload_records (
                id, object_key, filename, content_type, file_size,
                user_id, product_id, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(&record.key)
        .bind(&record.filename)
        .bind(&record.content_type)
        .bind(record.file_size)
        .bind(record.user_id)
        .bind(record.product_id)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_upload(&self, id: Uuid) -> Result<Option<UploadRecord>, AppError> {
        let row = sqlx::query_as::<_, UploadRecord>(
            r#"
            SELECT id, object_key, filename, content_type, file_size,
                   user_id, product_id, status, error_message, created_at, updated_at
            FROM upload_records
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn mark_completed(&self, id: Uuid, file_size: i64) -> Result<UploadRecord, AppError> {
        // Guarded transition: only a PENDING record may complete.
        let row = sqlx::query_as::<_, UploadRecord>(
            r#"
            UPDATE upload_records
            SET status = 'completed', file_size = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING id, object_key, filename, content_type, file_size,
                      user_id, product_id, status, error_message, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(file_size)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| {
            AppError::InvalidState(format!("upload {} is not pending and cannot be completed", id))
        })
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_records
            SET status = 'failed', error_message = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidState(format!(
                "upload {} is not pending and cannot be failed",
                id
            )));
        }

        Ok(())
    }

    async fn mark_deleted(&self, key: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_records
            SET status = 'deleted', updated_at = NOW()
            WHERE object_key = $1 AND status IN ('pending', 'completed')
            "#,
        )
        .bind(key)
        .execute(&self.pool)
        .await?;

        let transitioned = result.rows_affected() > 0;
        if !transitioned {
            tracing::debug!(key, "Delete transitioned no upload record");
        }
        Ok(transitioned)
    }

    async fn find_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<UploadRecord>, AppError> {
        let rows = sqlx::query_as::<_, UploadRecord>(
            r#"
            SELECT id, object_key, filename, content_type, file_size,
                   user_id, product_id, status, error_message, created_at, updated_at
            FROM upload_records
            WHERE status = $1 AND created_at < $2
            ORDER BY created_at
            "#,
        )
        .bind(UploadStatus::Pending.as_str())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn get_product_owner(&self, product_id: Uuid) -> Result<Option<Uuid>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT owner_id FROM products WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("owner_id")))
    }

    async fn find_owned_image(
        &self,
        user_id: Uuid,
        key: &str,
        product_id: Uuid,
    ) -> Result<Option<ProductImageRecord>, AppError> {
        let row = sqlx::query_as::<_, ProductImageRecord>(
            r#"
            SELECT pi.id, pi.product_id, pi.object_key, pi.created_at
            FROM product_images pi
            JOIN products p ON p.id = pi.product_id
            WHERE pi.object_key = $1 AND pi.product_id = $2 AND p.owner_id = $3
            "#,
        )
        .bind(key)
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn insert_product_image(&self, product_id: Uuid, key: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO product_images (id, product_id, object_key, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (product_id, object_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product_id)
        .bind(key)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(%product_id, key, "Image association already present");
        }
        Ok(())
    }

    async fn delete_product_images(&self, product_id: Uuid, key: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM product_images
            WHERE product_id = $1 AND object_key = $2
            "#,
        )
        .bind(product_id)
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
