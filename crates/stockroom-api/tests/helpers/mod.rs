//! Test helpers: build the router against in-memory backends.
//!
//! Run from workspace root: `cargo test -p stockroom-api`. No Docker,
//! Postgres, or AWS credentials required.

pub mod storage;

use axum_test::TestServer;
use std::sync::Arc;
use stockroom_api::middleware::rate_limit::{InMemoryRateLimitStore, RateLimitStore, RateLimiter};
use stockroom_api::setup::routes::build_router;
use stockroom_api::state::AppState;
use stockroom_core::{Config, StorageBackend};
use stockroom_db::{CatalogStore, InMemoryCatalogStore, InMemoryUploadStore, UploadStore};
use stockroom_storage::Storage;
use storage::RecordingStorage;
use uuid::Uuid;

pub const MAX_FILE_SIZE: i64 = 10 * 1024 * 1024;

/// Test application with handles on the backing stores for assertions.
pub struct TestApp {
    pub server: TestServer,
    pub uploads: Arc<InMemoryUploadStore>,
    pub catalog: Arc<InMemoryCatalogStore>,
    pub storage: Arc<RecordingStorage>,
}

pub fn test_config() -> Config {
    Config {
        server_port: 0,
        environment: "test".to_string(),
        cors_origins: vec!["*".to_string()],
        database_url: None,
        db_max_connections: 5,
        db_timeout_seconds: 5,
        storage_backend: StorageBackend::Memory,
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        upload_grant_ttl_secs: 3600,
        max_file_size_bytes: MAX_FILE_SIZE,
        allowed_content_types: vec![
            "image/jpeg".to_string(),
            "image/png".to_string(),
            "image/gif".to_string(),
            "image/webp".to_string(),
        ],
        initiate_rate_limit: 100,
        confirm_rate_limit: 100,
        delete_rate_limit: 100,
        rate_limit_window_secs: 60,
        rate_limit_sweep_interval_secs: 60,
        orphan_threshold_hours: 24,
        orphan_sweep_interval_secs: 0,
    }
}

/// Build the app with default (generous) rate limits.
pub fn setup_test_app() -> TestApp {
    setup_test_app_with_config(test_config())
}

pub fn setup_test_app_with_config(config: Config) -> TestApp {
    let store: Arc<dyn RateLimitStore> = Arc::new(InMemoryRateLimitStore::new());
    setup_test_app_with_limiter(config.clone(), RateLimiter::from_config(store, &config))
}

/// Build the app with a caller-supplied limiter (custom counter store).
pub fn setup_test_app_with_limiter(config: Config, limiter: RateLimiter) -> TestApp {
    let uploads = Arc::new(InMemoryUploadStore::new());
    let catalog = Arc::new(InMemoryCatalogStore::new());
    let storage = Arc::new(RecordingStorage::new());

    let state = Arc::new(AppState::new(
        config,
        uploads.clone(),
        catalog.clone(),
        storage.clone(),
    ));
    let router = build_router(state, Arc::new(limiter)).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        uploads,
        catalog,
        storage,
    }
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Build just the server against caller-supplied stores, for tests that
/// need a store double instead of the plain in-memory implementations.
pub fn build_test_server(
    config: Config,
    uploads: Arc<dyn UploadStore>,
    catalog: Arc<dyn CatalogStore>,
    storage: Arc<dyn Storage>,
) -> TestServer {
    let store: Arc<dyn RateLimitStore> = Arc::new(InMemoryRateLimitStore::new());
    let limiter = Arc::new(RateLimiter::from_config(store, &config));
    let state = Arc::new(AppState::new(config, uploads, catalog, storage));
    let router = build_router(state, limiter).expect("Failed to build router");
    TestServer::new(router).expect("Failed to start test server")
}

/// A fresh caller id for one test scenario.
pub fn test_user() -> Uuid {
    Uuid::new_v4()
}
