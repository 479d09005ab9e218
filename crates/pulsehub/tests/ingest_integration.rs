//! Integration tests for the request endpoint's router: auth gating,
//! validation-driven response shapes, and the rate limiter.
//!
//! These build the router in-process and drive it with
//! `tower::ServiceExt::oneshot`, never binding a real socket. The backing
//! `Store` points at an unreachable host with an aggressively short
//! server-selection timeout: persistence is fire-and-forget from the
//! handler's perspective (§4.3), so none of these assertions depend on it
//! ever succeeding.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use pulsehub::config::Config;
use pulsehub::metrics::test_prometheus_handle;
use pulsehub::presentation::request_router;
use pulsehub::state::AppState;
use pulsehub_store::Store;
use tower::ServiceExt;

const DEAD_MONGO_URI: &str =
    "mongodb://127.0.0.1:1/pulsehub_test?serverSelectionTimeoutMS=200&connectTimeoutMS=200";

fn test_config(rate_limit_per_sec: u32) -> Arc<Config> {
    Arc::new(Config {
        port: 0,
        mongodb_uri: DEAD_MONGO_URI.to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        allowed_origins: Vec::new(),
        raw_events_ttl_days: 7,
        max_msg_bytes: 32_768,
        request_rate_limit_per_sec: rate_limit_per_sec,
        backpressure_bytes: 1_048_576,
        janitor_interval_secs: 5,
    })
}

async fn test_app(rate_limit_per_sec: u32) -> axum::Router {
    let store = Store::connect(DEAD_MONGO_URI)
        .await
        .expect("connect only parses the URI, it never performs I/O");
    let state = AppState::new(test_config(rate_limit_per_sec), store, test_prometheus_handle());
    request_router(state)
}

fn peer_addr(last_octet: u8) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, last_octet)), 9999)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .extension(ConnectInfo(peer_addr(1)))
        .body(Body::empty())
        .expect("request should build")
}

fn post_json(uri: &str, bearer: Option<&str>, body: serde_json::Value, peer: SocketAddr) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .extension(ConnectInfo(peer));
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

async fn issue_token(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(get("/token?userId=dashboard-1"))
        .await
        .expect("request should complete");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json: serde_json::Value = serde_json::from_slice(&bytes).expect("body should be json");
    json["token"]
        .as_str()
        .expect("token field should be a string")
        .to_string()
}

#[tokio::test]
async fn health_is_always_ok() {
    let app = test_app(20).await;
    let response = app.oneshot(get("/health")).await.expect("request should complete");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn ingest_without_credential_is_rejected() {
    let app = test_app(20).await;
    let request = post_json(
        "/ingest",
        None,
        serde_json::json!([{"eventId": "A", "ts": 1, "sessionId": "s1", "route": "/", "action": "view"}]),
        peer_addr(2),
    );
    let response = app.oneshot(request).await.expect("request should complete");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ingest_with_valid_token_accepts_well_formed_batch() {
    let app = test_app(20).await;
    let token = issue_token(&app).await;

    let request = post_json(
        "/ingest",
        Some(&token),
        serde_json::json!([
            {"eventId": "A", "ts": 1, "userId": "u1", "sessionId": "s1", "route": "/", "action": "view"},
            {"eventId": "B", "ts": 2, "userId": "u1", "sessionId": "s1", "route": "/", "action": "error"},
        ]),
        peer_addr(3),
    );
    let response = app.oneshot(request).await.expect("request should complete");
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json: serde_json::Value = serde_json::from_slice(&bytes).expect("body should be json");
    assert_eq!(json["accepted"], 2);
}

#[tokio::test]
async fn ingest_drops_invalid_records_but_keeps_valid_ones() {
    let app = test_app(20).await;
    let token = issue_token(&app).await;

    let request = post_json(
        "/ingest",
        Some(&token),
        serde_json::json!([
            {"eventId": "A", "ts": 1, "sessionId": "s1", "route": "/", "action": "view"},
            {"eventId": "B", "ts": 2, "route": "/", "action": "view"},
        ]),
        peer_addr(4),
    );
    let response = app.oneshot(request).await.expect("request should complete");
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json: serde_json::Value = serde_json::from_slice(&bytes).expect("body should be json");
    assert_eq!(json["accepted"], 1);
}

#[tokio::test]
async fn ingest_with_all_invalid_records_responds_400() {
    let app = test_app(20).await;
    let token = issue_token(&app).await;

    let request = post_json(
        "/ingest",
        Some(&token),
        serde_json::json!([{"eventId": "A", "ts": 1, "route": "/", "action": "view"}]),
        peer_addr(5),
    );
    let response = app.oneshot(request).await.expect("request should complete");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ingest_with_empty_array_responds_400() {
    let app = test_app(20).await;
    let token = issue_token(&app).await;

    let request = post_json("/ingest", Some(&token), serde_json::json!([]), peer_addr(6));
    let response = app.oneshot(request).await.expect("request should complete");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rate_limiter_rejects_once_budget_exhausted() {
    let app = test_app(1).await;
    let token = issue_token(&app).await;
    let peer = peer_addr(7);
    let body = serde_json::json!([{"eventId": "A", "ts": 1, "sessionId": "s1", "route": "/", "action": "view"}]);

    let first = app
        .clone()
        .oneshot(post_json("/ingest", Some(&token), body.clone(), peer))
        .await
        .expect("request should complete");
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(post_json("/ingest", Some(&token), body, peer))
        .await
        .expect("request should complete");
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}
