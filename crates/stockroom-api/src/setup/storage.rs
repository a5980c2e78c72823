//! Storage backend setup

use anyhow::{Context, Result};
use std::sync::Arc;
use stockroom_core::Config;
use stockroom_storage::{create_storage, Storage};

pub fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage = create_storage(config).context("Failed to initialize storage backend")?;
    tracing::info!(
        backend = ?config.storage_backend,
        bucket = config.s3_bucket.as_deref().unwrap_or("-"),
        grant_ttl_secs = config.upload_grant_ttl_secs,
        "Storage backend initialized"
    );
    Ok(storage)
}
