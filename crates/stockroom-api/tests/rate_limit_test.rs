//! Rate limiting integration tests: headers, rejection, reset, fail-open.
//!
//! Run with: `cargo test -p stockroom-api --test rate_limit_test`

mod helpers;

use chrono::Duration as ChronoDuration;
use helpers::storage::FailingRateLimitStore;
use helpers::{setup_test_app_with_config, setup_test_app_with_limiter, test_config, test_user};
use serde_json::{json, Value};
use std::sync::Arc;
use stockroom_api::middleware::rate_limit::RateLimiter;

fn upload_body() -> Value {
    json!({
        "filename": "cat.png",
        "contentType": "image/png",
        "fileSize": 1024
    })
}

#[tokio::test]
async fn test_requests_over_limit_are_rejected() {
    let mut config = test_config();
    config.initiate_rate_limit = 3;
    let app = setup_test_app_with_config(config);
    let user = test_user();

    for i in 0..3 {
        let response = app
            .client()
            .post("/files/upload")
            .add_header("x-user-id", user.to_string())
            .json(&upload_body())
            .await;
        assert_eq!(response.status_code(), 200, "request {} should pass", i + 1);
        assert_eq!(response.header("x-ratelimit-limit"), "3");
    }

    let rejected = app
        .client()
        .post("/files/upload")
        .add_header("x-user-id", user.to_string())
        .json(&upload_body())
        .await;
    assert_eq!(rejected.status_code(), 429);
    assert_eq!(rejected.header("x-ratelimit-remaining"), "0");
    assert!(rejected.header("retry-after").to_str().unwrap().parse::<u64>().unwrap() >= 1);

    let body: Value = rejected.json();
    assert_eq!(body["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_remaining_header_counts_down() {
    let mut config = test_config();
    config.initiate_rate_limit = 3;
    let app = setup_test_app_with_config(config);
    let user = test_user();

    for expected_remaining in ["2", "1", "0"] {
        let response = app
            .client()
            .post("/files/upload")
            .add_header("x-user-id", user.to_string())
            .json(&upload_body())
            .await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.header("x-ratelimit-remaining"), expected_remaining);
    }
}

#[tokio::test]
async fn test_window_expiry_restores_capacity() {
    let mut config = test_config();
    config.initiate_rate_limit = 1;
    config.rate_limit_window_secs = 1;
    let app = setup_test_app_with_config(config);
    let user = test_user();

    let first = app
        .client()
        .post("/files/upload")
        .add_header("x-user-id", user.to_string())
        .json(&upload_body())
        .await;
    assert_eq!(first.status_code(), 200);

    let second = app
        .client()
        .post("/files/upload")
        .add_header("x-user-id", user.to_string())
        .json(&upload_body())
        .await;
    assert_eq!(second.status_code(), 429);

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    let third = app
        .client()
        .post("/files/upload")
        .add_header("x-user-id", user.to_string())
        .json(&upload_body())
        .await;
    assert_eq!(third.status_code(), 200);
}

#[tokio::test]
async fn test_identities_are_limited_independently() {
    let mut config = test_config();
    config.initiate_rate_limit = 1;
    let app = setup_test_app_with_config(config);
    let user = test_user();

    let first = app
        .client()
        .post("/files/upload")
        .add_header("x-user-id", user.to_string())
        .add_header("x-forwarded-for", "203.0.113.7")
        .json(&upload_body())
        .await;
    assert_eq!(first.status_code(), 200);

    // Same network identity is now exhausted.
    let rejected = app
        .client()
        .post("/files/upload")
        .add_header("x-user-id", user.to_string())
        .add_header("x-forwarded-for", "203.0.113.7")
        .json(&upload_body())
        .await;
    assert_eq!(rejected.status_code(), 429);

    // A different one still has its own budget.
    let other = app
        .client()
        .post("/files/upload")
        .add_header("x-user-id", user.to_string())
        .add_header("x-forwarded-for", "198.51.100.9")
        .json(&upload_body())
        .await;
    assert_eq!(other.status_code(), 200);
}

#[tokio::test]
async fn test_operations_have_separate_budgets() {
    let mut config = test_config();
    config.initiate_rate_limit = 1;
    config.confirm_rate_limit = 100;
    let app = setup_test_app_with_config(config);
    let user = test_user();

    let initiated = app
        .client()
        .post("/files/upload")
        .add_header("x-user-id", user.to_string())
        .json(&upload_body())
        .await;
    assert_eq!(initiated.status_code(), 200);
    let body: Value = initiated.json();
    let key = body["key"].as_str().unwrap();
    app.storage.put_object(key, 1024, "image/png").await;

    // Initiate budget is spent; confirm must still go through.
    let confirmed = app
        .client()
        .post("/files/confirm")
        .add_header("x-user-id", user.to_string())
        .json(&json!({ "uploadId": body["uploadId"], "key": key }))
        .await;
    assert_eq!(confirmed.status_code(), 200);
}

#[tokio::test]
async fn test_counter_store_failure_fails_open() {
    let config = test_config();
    let limiter = RateLimiter::new(
        Arc::new(FailingRateLimitStore),
        ChronoDuration::seconds(60),
        1,
        1,
        1,
    );
    let app = setup_test_app_with_limiter(config, limiter);
    let user = test_user();

    // Every call errors in the store, yet all requests are admitted and
    // no limit headers are attached.
    for _ in 0..5 {
        let response = app
            .client()
            .post("/files/upload")
            .add_header("x-user-id", user.to_string())
            .json(&upload_body())
            .await;
        assert_eq!(response.status_code(), 200);
        assert!(response.maybe_header("x-ratelimit-limit").is_none());
    }
}
