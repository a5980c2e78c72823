//! Fixed-window rate limiting for the lifecycle operations.
//!
//! Counters are keyed by (client identity, operation class) and live in a
//! sharded in-memory store behind the `RateLimitStore` trait. Rejection is
//! soft: a rejected call still advances the counter. Store failures fail
//! open; they travel on their own error channel and never become an
//! `AppError` on the request path.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use stockroom_core::Config;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const DEFAULT_SHARD_COUNT: usize = 16;
const MAX_ENTRIES_PER_SHARD: usize = 10_000;

/// The three guarded lifecycle operations, each with its own limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationClass {
    Initiate,
    Confirm,
    Delete,
}

impl OperationClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationClass::Initiate => "initiate",
            OperationClass::Confirm => "confirm",
            OperationClass::Delete => "delete",
        }
    }
}

/// Counting-store failure. Deliberately not convertible into `AppError`:
/// the middleware handles it by failing open.
#[derive(Debug, thiserror::Error)]
#[error("rate limit store error: {0}")]
pub struct RateLimitStoreError(pub String);

/// Counter state for one (identity, operation) window.
#[derive(Debug, Clone)]
pub struct WindowCount {
    pub count: u32,
    pub window_ends_at: DateTime<Utc>,
}

/// Counter store abstraction: get-or-create a window and increment it.
/// The in-memory sharded map is the default backend.
#[async_trait::async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Increment the counter for `key`, resetting it first when its window
    /// has expired. Always advances the count.
    async fn increment(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, RateLimitStoreError>;

    /// Drop expired entries. Returns how many were removed.
    async fn sweep_expired(&self) -> Result<usize, RateLimitStoreError>;
}

/// Sharded in-memory counter store.
///
/// Keys are hashed to pick a shard, so concurrent requests rarely contend
/// on the same mutex. Each shard holds a bounded number of entries; at
/// capacity the oldest-expiring entry is evicted.
pub struct InMemoryRateLimitStore {
    shards: Vec<Mutex<HashMap<String, WindowCount>>>,
    max_entries_per_shard: usize,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARD_COUNT, MAX_ENTRIES_PER_SHARD)
    }

    pub fn with_shards(shard_count: usize, max_entries_per_shard: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            shards,
            max_entries_per_shard,
        }
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    #[cfg(test)]
    pub async fn entry_count(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.lock().await.len();
        }
        total
    }
}

impl Default for InMemoryRateLimitStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn increment(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, RateLimitStoreError> {
        let now = Utc::now();
        let shard = &self.shards[self.shard_index(key)];
        let mut entries = shard.lock().await;

        match entries.get_mut(key) {
            Some(entry) if entry.window_ends_at > now => {
                entry.count += 1;
                Ok(entry.clone())
            }
            Some(entry) => {
                // Window expired: reset to 1 with a fresh expiry.
                entry.count = 1;
                entry.window_ends_at = now + window;
                Ok(entry.clone())
            }
            None => {
                if entries.len() >= self.max_entries_per_shard {
                    let oldest = entries
                        .iter()
                        .min_by_key(|(_, e)| e.window_ends_at)
                        .map(|(k, _)| k.clone());
                    if let Some(evict) = oldest {
                        entries.remove(&evict);
                        tracing::debug!(
                            evicted_key = %evict,
                            "Evicted oldest rate limit entry at shard capacity"
                        );
                    }
                }
                let entry = WindowCount {
                    count: 1,
                    window_ends_at: now + window,
                };
                entries.insert(key.to_string(), entry.clone());
                Ok(entry)
            }
        }
    }

    async fn sweep_expired(&self) -> Result<usize, RateLimitStoreError> {
        let now = Utc::now();
        let mut removed = 0;
        for shard in &self.shards {
            let mut entries = shard.lock().await;
            let before = entries.len();
            entries.retain(|_, entry| entry.window_ends_at > now);
            removed += before - entries.len();
        }
        Ok(removed)
    }
}

/// Outcome of one `allow` call. Carried into response headers either way.
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    window: Duration,
    initiate_limit: u32,
    confirm_limit: u32,
    delete_limit: u32,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn RateLimitStore>,
        window: Duration,
        initiate_limit: u32,
        confirm_limit: u32,
        delete_limit: u32,
    ) -> Self {
        Self {
            store,
            window,
            initiate_limit,
            confirm_limit,
            delete_limit,
        }
    }

    pub fn from_config(store: Arc<dyn RateLimitStore>, config: &Config) -> Self {
        Self::new(
            store,
            Duration::seconds(config.rate_limit_window_secs as i64),
            config.initiate_rate_limit,
            config.confirm_rate_limit,
            config.delete_rate_limit,
        )
    }

    fn limit_for(&self, class: OperationClass) -> u32 {
        match class {
            OperationClass::Initiate => self.initiate_limit,
            OperationClass::Confirm => self.confirm_limit,
            OperationClass::Delete => self.delete_limit,
        }
    }

    /// Count this call and decide. Rejected calls are counted too, so a
    /// client hammering a closed window keeps its counter saturated.
    pub async fn allow(
        &self,
        identity: &str,
        class: OperationClass,
    ) -> Result<RateLimitDecision, RateLimitStoreError> {
        let limit = self.limit_for(class);
        let key = format!("{}:{}", class.as_str(), identity);
        let entry = self.store.increment(&key, self.window).await?;
        Ok(RateLimitDecision {
            allowed: entry.count <= limit,
            limit,
            remaining: limit.saturating_sub(entry.count),
            reset_at: entry.window_ends_at,
        })
    }

    /// Spawn the periodic stale-entry sweep. Maintenance only; the request
    /// path never waits on it.
    pub fn start_sweeper(self: &Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        let store = self.store.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                match store.sweep_expired().await {
                    Ok(removed) if removed > 0 => {
                        tracing::debug!(removed, "Swept expired rate limit entries");
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(error = %err, "Rate limit sweep failed");
                    }
                }
            }
        })
    }
}

/// Client identity for limiter keys: the first forwarded client IP, or the
/// "unknown" sentinel when no forwarding header is present.
pub fn client_identity(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

fn insert_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    if let Ok(value) = HeaderValue::from_str(&decision.limit.to_string()) {
        headers.insert("X-RateLimit-Limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.reset_at.timestamp().to_string()) {
        headers.insert("X-RateLimit-Reset", value);
    }
}

/// Rate limiting middleware, attached per route with its operation class.
pub async fn rate_limit_middleware(
    State((limiter, class)): State<(Arc<RateLimiter>, OperationClass)>,
    request: Request,
    next: Next,
) -> Response {
    let identity = client_identity(request.headers());

    match limiter.allow(&identity, class).await {
        Ok(decision) if decision.allowed => {
            let mut response = next.run(request).await;
            insert_limit_headers(response.headers_mut(), &decision);
            response
        }
        Ok(decision) => {
            let retry_after = (decision.reset_at - Utc::now()).num_seconds().max(1);
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                axum::Json(serde_json::json!({
                    "error": "Too many requests. Please slow down.",
                    "code": "RATE_LIMITED"
                })),
            )
                .into_response();
            insert_limit_headers(response.headers_mut(), &decision);
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
            response
        }
        Err(err) => {
            // Fail open: the guarded operation proceeds, without limit headers.
            tracing::warn!(
                error = %err,
                operation = class.as_str(),
                "Rate limit store unavailable; failing open"
            );
            next.run(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(window_secs: u64) -> RateLimiter {
        RateLimiter::new(
            Arc::new(InMemoryRateLimitStore::new()),
            Duration::seconds(window_secs as i64),
            3,
            3,
            3,
        )
    }

    #[tokio::test]
    async fn test_rejects_after_limit_with_zero_remaining() {
        let limiter = limiter(60);
        for i in 0..3 {
            let decision = limiter.allow("1.2.3.4", OperationClass::Initiate).await.unwrap();
            assert!(decision.allowed, "call {} should be allowed", i + 1);
        }
        let rejected = limiter.allow("1.2.3.4", OperationClass::Initiate).await.unwrap();
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
        // Soft rejection: the counter kept advancing, so the next call is
        // still rejected.
        let again = limiter.allow("1.2.3.4", OperationClass::Initiate).await.unwrap();
        assert!(!again.allowed);
    }

    #[tokio::test]
    async fn test_window_expiry_resets_counter() {
        let limiter = limiter(1);
        for _ in 0..4 {
            limiter.allow("1.2.3.4", OperationClass::Confirm).await.unwrap();
        }
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        let decision = limiter.allow("1.2.3.4", OperationClass::Confirm).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
    }

    #[tokio::test]
    async fn test_operation_classes_count_separately() {
        let limiter = limiter(60);
        for _ in 0..3 {
            limiter.allow("1.2.3.4", OperationClass::Initiate).await.unwrap();
        }
        let other_class = limiter.allow("1.2.3.4", OperationClass::Delete).await.unwrap();
        assert!(other_class.allowed);
        assert_eq!(other_class.remaining, 2);
    }

    #[tokio::test]
    async fn test_identities_count_separately() {
        let limiter = limiter(60);
        for _ in 0..4 {
            limiter.allow("1.2.3.4", OperationClass::Initiate).await.unwrap();
        }
        let other = limiter.allow("5.6.7.8", OperationClass::Initiate).await.unwrap();
        assert!(other.allowed);
    }

    #[tokio::test]
    async fn test_capacity_eviction() {
        let store = InMemoryRateLimitStore::with_shards(1, 2);
        let window = Duration::seconds(60);
        store.increment("a", window).await.unwrap();
        store.increment("b", window).await.unwrap();
        store.increment("c", window).await.unwrap();
        assert_eq!(store.entry_count().await, 2);
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_entries() {
        let store = InMemoryRateLimitStore::new();
        store.increment("a", Duration::milliseconds(10)).await.unwrap();
        store.increment("b", Duration::seconds(60)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        let removed = store.sweep_expired().await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.entry_count().await, 1);
    }

    #[test]
    fn test_client_identity_from_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(client_identity(&headers), "203.0.113.9");

        assert_eq!(client_identity(&HeaderMap::new()), "unknown");

        let mut empty = HeaderMap::new();
        empty.insert("x-forwarded-for", "  ".parse().unwrap());
        assert_eq!(client_identity(&empty), "unknown");
    }
}
