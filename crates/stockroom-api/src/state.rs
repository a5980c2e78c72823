//! Application state shared across handlers.

use std::sync::Arc;
use stockroom_core::{Config, UploadValidator};
use stockroom_db::{CatalogStore, UploadStore};
use stockroom_services::OwnershipVerifier;
use stockroom_storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub uploads: Arc<dyn UploadStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub storage: Arc<dyn Storage>,
    pub ownership: OwnershipVerifier,
    pub validator: UploadValidator,
}

impl AppState {
    pub fn new(
        config: Config,
        uploads: Arc<dyn UploadStore>,
        catalog: Arc<dyn CatalogStore>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let ownership = OwnershipVerifier::new(catalog.clone(), uploads.clone());
        let validator = UploadValidator::new(
            config.max_file_size_bytes,
            config.allowed_content_types.clone(),
        );
        Self {
            config,
            uploads,
            catalog,
            storage,
            ownership,
            validator,
        }
    }
}
