//! Object store gateway for the stockroom service.
//!
//! The `Storage` trait covers the three lifecycle operations the service
//! performs against the remote store: issuing time-boxed upload grants,
//! probing object existence/metadata, and deleting objects. The S3 backend
//! goes through `object_store`; the in-memory backend serves tests and
//! development runs.
//!
//! # Key format
//!
//! Keys are always `assets/{uuid}/{sanitized-filename}`, generated
//! server-side in the `keys` module. Callers never supply keys.

pub mod factory;
pub mod keys;
pub mod memory;
pub mod s3;
pub mod traits;

pub use factory::create_storage;
pub use keys::{build_object_key, sanitize_filename};
pub use memory::MemoryStorage;
pub use s3::S3Storage;
pub use traits::{ObjectProbe, Storage, StorageError, StorageResult, UploadGrant};
