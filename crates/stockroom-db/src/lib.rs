//! Metadata-store access for the stockroom service.
//!
//! The `UploadStore` and `CatalogStore` traits are the seams through which
//! handlers and services reach the relational store. The Postgres
//! implementations use runtime sqlx queries so builds never need a live
//! `DATABASE_URL`; the in-memory implementations back tests and
//! single-process development runs.

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::{InMemoryCatalogStore, InMemoryUploadStore};
pub use postgres::{PgCatalogStore, PgUploadStore};
pub use traits::{CatalogStore, UploadStore};
