//! HTTP application for the stockroom upload lifecycle service.
//!
//! Everything is public so the integration tests under `tests/` can build
//! the router against in-memory backends.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod setup;
pub mod state;
pub mod telemetry;
