//! Configuration module
//!
//! Environment-driven configuration for the stockroom API. Defaults are
//! defined as constants; `from_env` loads a `.env` file first when present
//! and `validate` enforces production constraints before startup proceeds.

use std::env;
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const UPLOAD_GRANT_TTL_SECS: u64 = 3600;
const MAX_FILE_SIZE_BYTES: i64 = 10 * 1024 * 1024;
const INITIATE_RATE_LIMIT_PER_WINDOW: u32 = 10;
const CONFIRM_RATE_LIMIT_PER_WINDOW: u32 = 15;
const DELETE_RATE_LIMIT_PER_WINDOW: u32 = 20;
const RATE_LIMIT_WINDOW_SECS: u64 = 60;
const RATE_LIMIT_SWEEP_INTERVAL_SECS: u64 = 60;
const ORPHAN_THRESHOLD_HOURS: i64 = 24;

/// Storage backend selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    /// S3 or an S3-compatible store reached through bucket/region/endpoint settings.
    S3,
    /// In-process store for tests and single-process development runs.
    /// Metadata also lives in memory in this mode; no database is required.
    Memory,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub upload_grant_ttl_secs: u64,
    pub max_file_size_bytes: i64,
    pub allowed_content_types: Vec<String>,
    pub initiate_rate_limit: u32,
    pub confirm_rate_limit: u32,
    pub delete_rate_limit: u32,
    pub rate_limit_window_secs: u64,
    pub rate_limit_sweep_interval_secs: u64,
    pub orphan_threshold_hours: i64,
    /// Interval for the in-process orphan sweep. 0 = external scheduler only.
    pub orphan_sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let storage_backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            _ => StorageBackend::S3,
        };

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| "image/jpeg,image/png,image/gif,image/webp".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok().filter(|s| !s.is_empty()),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok()
                .filter(|s| !s.is_empty()),
            s3_endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            upload_grant_ttl_secs: env::var("UPLOAD_GRANT_TTL_SECS")
                .unwrap_or_else(|_| UPLOAD_GRANT_TTL_SECS.to_string())
                .parse()
                .unwrap_or(UPLOAD_GRANT_TTL_SECS),
            max_file_size_bytes: env::var("MAX_FILE_SIZE_BYTES")
                .unwrap_or_else(|_| MAX_FILE_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(MAX_FILE_SIZE_BYTES),
            allowed_content_types,
            initiate_rate_limit: env::var("UPLOAD_RATE_LIMIT_PER_WINDOW")
                .unwrap_or_else(|_| INITIATE_RATE_LIMIT_PER_WINDOW.to_string())
                .parse()
                .unwrap_or(INITIATE_RATE_LIMIT_PER_WINDOW),
            confirm_rate_limit: env::var("CONFIRM_RATE_LIMIT_PER_WINDOW")
                .unwrap_or_else(|_| CONFIRM_RATE_LIMIT_PER_WINDOW.to_string())
                .parse()
                .unwrap_or(CONFIRM_RATE_LIMIT_PER_WINDOW),
            delete_rate_limit: env::var("DELETE_RATE_LIMIT_PER_WINDOW")
                .unwrap_or_else(|_| DELETE_RATE_LIMIT_PER_WINDOW.to_string())
                .parse()
                .unwrap_or(DELETE_RATE_LIMIT_PER_WINDOW),
            rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                .unwrap_or_else(|_| RATE_LIMIT_WINDOW_SECS.to_string())
                .parse()
                .unwrap_or(RATE_LIMIT_WINDOW_SECS),
            rate_limit_sweep_interval_secs: env::var("RATE_LIMIT_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| RATE_LIMIT_SWEEP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(RATE_LIMIT_SWEEP_INTERVAL_SECS),
            orphan_threshold_hours: env::var("ORPHAN_THRESHOLD_HOURS")
                .unwrap_or_else(|_| ORPHAN_THRESHOLD_HOURS.to_string())
                .parse()
                .unwrap_or(ORPHAN_THRESHOLD_HOURS),
            orphan_sweep_interval_secs: env::var("ORPHAN_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap_or(0),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn upload_grant_ttl(&self) -> Duration {
        Duration::from_secs(self.upload_grant_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.max_file_size_bytes <= 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_BYTES must be positive"));
        }

        if self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_CONTENT_TYPES must not be empty"));
        }

        if self.rate_limit_window_secs == 0 {
            return Err(anyhow::anyhow!("RATE_LIMIT_WINDOW_SECS must be positive"));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
                let database_url = self.database_url.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("DATABASE_URL must be set when using S3 storage backend")
                })?;
                if !database_url.starts_with("postgresql://") {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ));
                }
            }
            StorageBackend::Memory => {
                if self.is_production() {
                    return Err(anyhow::anyhow!(
                        "STORAGE_BACKEND=memory is not allowed in production"
                    ));
                }
            }
        }

        Ok(())
    }
}
