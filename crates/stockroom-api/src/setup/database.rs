//! Database setup and metadata-store selection

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use stockroom_core::{Config, StorageBackend};
use stockroom_db::{
    CatalogStore, InMemoryCatalogStore, InMemoryUploadStore, PgCatalogStore, PgUploadStore,
    UploadStore,
};

/// Setup database connection pool and run migrations
pub async fn setup_database(config: &Config) -> Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is not configured")?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database connected successfully"
    );

    // Run pending migrations on startup (path: workspace migrations/ from crate root)
    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Build the metadata stores for the configured backend.
///
/// The memory backend runs entirely in-process and needs no database; it
/// exists for tests and single-process development runs.
pub async fn setup_stores(
    config: &Config,
) -> Result<(Arc<dyn UploadStore>, Arc<dyn CatalogStore>)> {
    match config.storage_backend {
        StorageBackend::S3 => {
            let pool = setup_database(config).await?;
            Ok((
                Arc::new(PgUploadStore::new(pool.clone())),
                Arc::new(PgCatalogStore::new(pool)),
            ))
        }
        StorageBackend::Memory => {
            tracing::info!("Using in-memory metadata stores");
            Ok((
                Arc::new(InMemoryUploadStore::new()),
                Arc::new(InMemoryCatalogStore::new()),
            ))
        }
    }
}
