//! Route configuration and setup

use crate::auth::identity_middleware;
use crate::handlers;
use crate::middleware::rate_limit::{
    rate_limit_middleware, InMemoryRateLimitStore, OperationClass, RateLimiter,
};
use crate::middleware::request_id_middleware;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use stockroom_core::Config;
use stockroom_services::OrphanReconciler;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

// The lifecycle endpoints carry small JSON control-plane bodies; file bytes
// go directly to storage and never pass through this server.
const MAX_BODY_BYTES: usize = 64 * 1024;
const HTTP_CONCURRENCY_LIMIT: usize = 1024;

/// Build the full application router.
///
/// Takes the limiter explicitly so tests can wire a router against
/// in-memory backends and a deterministic counter store.
pub fn build_router(state: Arc<AppState>, limiter: Arc<RateLimiter>) -> anyhow::Result<Router> {
    let cors = setup_cors(&state.config)?;

    let app = public_routes()
        .merge(files_routes(&limiter))
        .nest(
            "/docs",
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
                .path("/docs")
                .into(),
        )
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

/// Routes that require no caller identity and no rate limiting.
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::ApiDoc::openapi()) }),
        )
}

/// The three lifecycle routes, each behind its own rate limit class, all
/// behind the identity middleware.
fn files_routes(limiter: &Arc<RateLimiter>) -> Router<Arc<AppState>> {
    let limited = |class: OperationClass| {
        axum::middleware::from_fn_with_state((limiter.clone(), class), rate_limit_middleware)
    };

    Router::new()
        .route(
            "/files/upload",
            post(handlers::files::initiate_upload).layer(limited(OperationClass::Initiate)),
        )
        .route(
            "/files/confirm",
            post(handlers::files::confirm_upload).layer(limited(OperationClass::Confirm)),
        )
        .route(
            "/files/delete",
            delete(handlers::files::delete_file).layer(limited(OperationClass::Delete)),
        )
        .route_layer(axum::middleware::from_fn(identity_middleware))
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Build the rate limiter over the default in-memory counter store.
pub fn setup_rate_limiter(config: &Config) -> Arc<RateLimiter> {
    Arc::new(RateLimiter::from_config(
        Arc::new(InMemoryRateLimitStore::new()),
        config,
    ))
}

/// Spawn the limiter sweep task and, when configured, the in-process
/// orphan reconciler.
pub fn spawn_background_tasks(config: &Config, state: &Arc<AppState>, limiter: &Arc<RateLimiter>) {
    if config.rate_limit_sweep_interval_secs > 0 {
        limiter.start_sweeper(Duration::from_secs(config.rate_limit_sweep_interval_secs));
        tracing::info!(
            interval_secs = config.rate_limit_sweep_interval_secs,
            "Rate limit sweep task started"
        );
    }

    if config.orphan_sweep_interval_secs > 0 {
        let reconciler = Arc::new(OrphanReconciler::new(
            state.uploads.clone(),
            state.storage.clone(),
            ChronoDuration::hours(config.orphan_threshold_hours),
        ));
        reconciler.start(Duration::from_secs(config.orphan_sweep_interval_secs));
    }
}
