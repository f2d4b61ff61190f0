//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use slim_cache::{
    api::create_router,
    cache::{CacheOptions, CacheStore, CoarseClock},
    AppState,
};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_state() -> AppState {
    let clock = Arc::new(CoarseClock::starting_at(1_700_000_000_000));
    let cache = CacheStore::with_clock(CacheOptions::manual_sweep(), clock);
    AppState::new(cache, Duration::from_secs(300))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// == SET / GET ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_router(create_test_state());

    let (status, json) = send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"test_key","value":"test_value"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("test_key"));
    assert_eq!(json["partition"], "");
}

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_router(create_test_state());

    send(&app, "PUT", "/set", Some(r#"{"key":"get_key","value":"get_value"}"#)).await;
    let (status, json) = send(&app, "GET", "/get/get_key", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "get_key");
    assert_eq!(json["value"], "get_value");
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_router(create_test_state());

    let (status, json) = send(&app, "GET", "/get/nonexistent", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("nonexistent"));
}

#[tokio::test]
async fn test_partitions_are_isolated() {
    let app = create_router(create_test_state());

    send(&app, "PUT", "/set", Some(r#"{"key":"k","value":"one","partition":"a"}"#)).await;
    send(&app, "PUT", "/set", Some(r#"{"key":"k","value":"two","partition":"b"}"#)).await;

    let (_, a) = send(&app, "GET", "/get/k?partition=a", None).await;
    let (_, b) = send(&app, "GET", "/get/k?partition=b", None).await;
    assert_eq!(a["value"], "one");
    assert_eq!(b["value"], "two");

    let (status, _) = send(&app, "DELETE", "/del/k?partition=a", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/get/k?partition=a", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", "/get/k?partition=b", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/get/k", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let state = create_test_state();
    let app = create_router(state.clone());

    send(&app, "PUT", "/set", Some(r#"{"key":"ttl_key","value":"v","ttl":1}"#)).await;
    let (status, _) = send(&app, "GET", "/get/ttl_key", None).await;
    assert_eq!(status, StatusCode::OK);

    state.cache.clock().advance(Duration::from_secs(2));

    let (status, _) = send(&app, "GET", "/get/ttl_key", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sliding_expiration_via_api() {
    let state = create_test_state();
    let app = create_router(state.clone());

    send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"session","value":"s","ttl":2,"sliding":2}"#),
    )
    .await;

    for _ in 0..5 {
        state.cache.clock().advance(Duration::from_secs(1));
        let (status, _) = send(&app, "GET", "/get/session", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    state.cache.clock().advance(Duration::from_secs(3));
    let (status, _) = send(&app, "GET", "/get/session", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == DELETE ==

#[tokio::test]
async fn test_delete_endpoint_not_found() {
    let app = create_router(create_test_state());

    let (status, json) = send(&app, "DELETE", "/del/nonexistent", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json.get("error").is_some());
}

// == RENAME ==

#[tokio::test]
async fn test_rename_endpoint() {
    let app = create_router(create_test_state());
    send(&app, "PUT", "/set", Some(r#"{"key":"old","value":"v"}"#)).await;

    let (status, json) = send(
        &app,
        "POST",
        "/rename",
        Some(r#"{"from":"old","to":"new","to_partition":"p"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["moved"], true);

    let (status, _) = send(&app, "GET", "/get/old", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, json) = send(&app, "GET", "/get/new?partition=p", None).await;
    assert_eq!(json["value"], "v");

    let (_, json) = send(&app, "POST", "/rename", Some(r#"{"from":"new","to":"new"}"#)).await;
    assert_eq!(json["moved"], false);
}

#[tokio::test]
async fn test_rename_missing_key_is_bad_request() {
    let app = create_router(create_test_state());

    let (status, _) = send(&app, "POST", "/rename", Some(r#"{"from":"a"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// == SWEEP / CLEAR / STATS ==

#[tokio::test]
async fn test_sweep_and_stats_endpoints() {
    let state = create_test_state();
    let app = create_router(state.clone());

    send(&app, "PUT", "/set", Some(r#"{"key":"a","value":"1","ttl":1}"#)).await;
    send(&app, "PUT", "/set", Some(r#"{"key":"b","value":"2","ttl":60}"#)).await;
    state.cache.clock().advance(Duration::from_secs(2));

    // Expired but unswept entries still count
    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats["count"], 2);

    let (status, json) = send(&app, "POST", "/sweep", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 1);

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats["count"], 1);
    assert_eq!(stats["sweep_in_progress"], false);
    assert!(stats["last_sweep"].is_string());
}

#[tokio::test]
async fn test_clear_endpoint() {
    let app = create_router(create_test_state());
    send(&app, "PUT", "/set", Some(r#"{"key":"a","value":"1"}"#)).await;
    send(&app, "PUT", "/set", Some(r#"{"key":"b","value":"2","partition":"p"}"#)).await;

    let (status, json) = send(&app, "DELETE", "/clear", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cleared"], 2);

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats["count"], 0);
}

#[tokio::test]
async fn test_disposed_store_returns_unavailable() {
    let state = create_test_state();
    let app = create_router(state.clone());
    state.cache.dispose();

    let (status, _) = send(&app, "PUT", "/set", Some(r#"{"key":"a","value":"1"}"#)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, _) = send(&app, "POST", "/sweep", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// == SUMMARY ==

#[tokio::test]
async fn test_summary_endpoint_groups_numbers() {
    let state = create_test_state();
    let app = create_router(state.clone());

    send(&app, "PUT", "/set", Some(r#"{"key":"req1","value":"x","partition":"api"}"#)).await;
    send(&app, "PUT", "/set", Some(r#"{"key":"req22","value":"x","partition":"api"}"#)).await;
    send(&app, "PUT", "/set", Some(r#"{"key":"req3","value":"x","partition":"api","ttl":1}"#)).await;
    send(&app, "PUT", "/set", Some(r#"{"key":"user9","value":"x"}"#)).await;
    send(&app, "GET", "/get/req1?partition=api", None).await;
    state.cache.clock().advance(Duration::from_secs(2));

    let (status, json) = send(&app, "GET", "/summary?normalize=numbers&partition=api", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["expired"], 1);
    assert_eq!(json["buckets"]["req#"]["count"], 2);
    assert_eq!(json["buckets"]["req#"]["total_access_count"], 1);
    assert!(json["buckets"].get("user#").is_none());

    let (_, json) = send(&app, "GET", "/summary", None).await;
    assert_eq!(json["buckets"]["user9"]["count"], 1);
}

#[tokio::test]
async fn test_summary_unknown_normalizer() {
    let app = create_router(create_test_state());

    let (status, _) = send(&app, "GET", "/summary?normalize=vowels", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// == Error Handling ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(create_test_state());

    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_empty_key_request() {
    let app = create_router(create_test_state());

    // An empty key is a valid key; a missing one is not
    let (status, _) = send(&app, "PUT", "/set", Some(r#"{"key":"","value":"v"}"#)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "PUT", "/set", Some(r#"{"value":"v"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Invalid key"));
}
