//! Ownership verification.
//!
//! All three checks are pure reads and must run strictly before any
//! mutating or storage-affecting operation. Absence and ownership mismatch
//! fail with the same forbidden error so callers cannot probe for the
//! existence of other users' resources.

use std::sync::Arc;
use stockroom_core::models::UploadRecord;
use stockroom_core::AppError;
use stockroom_db::{CatalogStore, UploadStore};
use uuid::Uuid;

fn forbidden() -> AppError {
    AppError::Forbidden("access denied".to_string())
}

#[derive(Clone)]
pub struct OwnershipVerifier {
    catalog: Arc<dyn CatalogStore>,
    uploads: Arc<dyn UploadStore>,
}

impl OwnershipVerifier {
    pub fn new(catalog: Arc<dyn CatalogStore>, uploads: Arc<dyn UploadStore>) -> Self {
        Self { catalog, uploads }
    }

    /// Fails unless the product exists and is owned by `user_id`.
    pub async fn verify_product_ownership(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), AppError> {
        match self.catalog.get_product_owner(product_id).await? {
            Some(owner) if owner == user_id => Ok(()),
            _ => Err(forbidden()),
        }
    }

    /// Fails unless the upload record exists and belongs to `user_id`.
    /// Returns the verified record; the confirm path needs it immediately.
    pub async fn verify_upload_ownership(
        &self,
        user_id: Uuid,
        upload_id: Uuid,
    ) -> Result<UploadRecord, AppError> {
        match self.uploads.get_upload(upload_id).await? {
            Some(record) if record.user_id == user_id => Ok(record),
            _ => Err(forbidden()),
        }
    }

    /// Fails unless an image row matches the storage key and belongs to a
    /// product with the given id owned by `user_id`. Ownership is checked
    /// transitively through the parent product.
    pub async fn verify_image_ownership(
        &self,
        user_id: Uuid,
        key: &str,
        product_id: Uuid,
    ) -> Result<(), AppError> {
        match self
            .catalog
            .find_owned_image(user_id, key, product_id)
            .await?
        {
            Some(_) => Ok(()),
            None => Err(forbidden()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_db::{InMemoryCatalogStore, InMemoryUploadStore};

    fn verifier() -> (
        OwnershipVerifier,
        Arc<InMemoryCatalogStore>,
        Arc<InMemoryUploadStore>,
    ) {
        let catalog = Arc::new(InMemoryCatalogStore::new());
        let uploads = Arc::new(InMemoryUploadStore::new());
        (
            OwnershipVerifier::new(catalog.clone(), uploads.clone()),
            catalog,
            uploads,
        )
    }

    #[tokio::test]
    async fn test_product_ownership() {
        let (verifier, catalog, _) = verifier();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let product_id = catalog.add_product(owner, "lamp").await;

        assert!(verifier
            .verify_product_ownership(owner, product_id)
            .await
            .is_ok());
        assert!(matches!(
            verifier.verify_product_ownership(stranger, product_id).await,
            Err(AppError::Forbidden(_))
        ));
        // Nonexistent product fails identically to a mismatch.
        assert!(matches!(
            verifier.verify_product_ownership(owner, Uuid::new_v4()).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_ownership_returns_record() {
        let (verifier, _, uploads) = verifier();
        let owner = Uuid::new_v4();
        let record = UploadRecord::new_pending(
            "assets/a/cat.png".to_string(),
            "cat.png".to_string(),
            "image/png".to_string(),
            1024,
            owner,
            None,
        );
        uploads.create_upload(&record).await.unwrap();

        let verified = verifier
            .verify_upload_ownership(owner, record.id)
            .await
            .unwrap();
        assert_eq!(verified.key, "assets/a/cat.png");

        assert!(verifier
            .verify_upload_ownership(Uuid::new_v4(), record.id)
            .await
            .is_err());
        assert!(verifier
            .verify_upload_ownership(owner, Uuid::new_v4())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_image_ownership_is_transitive() {
        let (verifier, catalog, _) = verifier();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let product_id = catalog.add_product(owner, "lamp").await;
        catalog
            .insert_product_image(product_id, "assets/a/lamp.png")
            .await
            .unwrap();

        assert!(verifier
            .verify_image_ownership(owner, "assets/a/lamp.png", product_id)
            .await
            .is_ok());
        // Wrong caller: the image exists but its parent product is not theirs.
        assert!(verifier
            .verify_image_ownership(stranger, "assets/a/lamp.png", product_id)
            .await
            .is_err());
        // Wrong key for the right product.
        assert!(verifier
            .verify_image_ownership(owner, "assets/a/other.png", product_id)
            .await
            .is_err());
    }
}
