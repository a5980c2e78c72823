//! Core types for the stockroom file lifecycle service.
//!
//! This crate holds configuration, the unified `AppError` type, domain
//! models for upload records and catalog rows, and upload input validation.
//! It has no HTTP or storage-backend dependencies.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

pub use config::{Config, StorageBackend};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use validation::{UploadValidator, ValidationError};
