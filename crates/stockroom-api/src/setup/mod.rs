//! Application setup and initialization
//!
//! All startup wiring lives here, extracted from main.rs so tests and the
//! binary share the same construction path.

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use stockroom_core::Config;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        port = config.server_port,
        backend = ?config.storage_backend,
        max_file_size_bytes = config.max_file_size_bytes,
        initiate_rate_limit = config.initiate_rate_limit,
        confirm_rate_limit = config.confirm_rate_limit,
        delete_rate_limit = config.delete_rate_limit,
        "Configuration loaded and validated successfully"
    );

    // Metadata stores (Postgres for the s3 backend, in-memory for dev)
    let (uploads, catalog) = database::setup_stores(&config).await?;

    // Object store gateway
    let storage = storage::setup_storage(&config)?;

    let state = Arc::new(AppState::new(config.clone(), uploads, catalog, storage));

    let limiter = routes::setup_rate_limiter(&config);
    let router = routes::build_router(state.clone(), limiter.clone())?;
    routes::spawn_background_tasks(&config, &state, &limiter);

    Ok((state, router))
}
