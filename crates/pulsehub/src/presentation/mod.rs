//! Presentation layer: HTTP/WebSocket routes, handlers, and error responses.
//!
//! Two routers are composed here: [`request_router`] binds the request
//! endpoint (`PORT`) and carries health, metrics, token issuance, and
//! ingestion; [`streaming_router`] binds the streaming endpoint (`PORT + 1`)
//! and carries only the `/ws` upgrade.

pub mod error;
pub mod health;
pub mod ingest;
pub mod metrics;
pub mod middleware;
pub mod streaming;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use middleware::MakeRequestUuidV7;

/// The only topic dashboard clients subscribe to.
pub const DASHBOARD_TOPIC: &str = "dashboard:global";

/// Compose the request endpoint's router (health, readiness, metrics,
/// token issuance, ingestion).
///
/// # Middleware stack (outermost first)
///
/// 1. `SetRequestIdLayer` — generates a UUID v7 request ID (or preserves an existing one)
/// 2. `TraceLayer` — one `info` span per request with method, path, and request id
/// 3. `PropagateRequestIdLayer` — copies the request id to the response header
/// 4. `CorsLayer` — restricts cross-origin access to the configured allow-list
/// 5. `DefaultBodyLimit` — caps the request body at `MAX_MSG_BYTES`
pub fn request_router(state: AppState) -> Router {
    let x_request_id = http::HeaderName::from_static("x-request-id");
    let max_msg_bytes = state.config.max_msg_bytes;
    let cors = cors_layer(&state.config.allowed_origins);
    let rate_limiter = state.rate_limiter.clone();

    let rate_limited_ingest = ingest::routes()
        .with_state(state.clone())
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            middleware::rate_limit,
        ));

    let stateful = Router::new()
        .merge(health::routes().with_state(state.clone()))
        .merge(metrics::routes().with_state(state))
        .merge(rate_limited_ingest);

    stateful
        .layer(DefaultBodyLimit::max(max_msg_bytes))
        .layer(cors)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &http::Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http.request",
                    http.request.method = %request.method(),
                    url.path = %request.uri().path(),
                    request_id = %request_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuidV7))
}

/// Compose the streaming endpoint's router (`/ws` only).
pub fn streaming_router(state: AppState) -> Router {
    Router::new().merge(streaming::routes()).with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new();
    }
    let origins: Vec<http::HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| http::HeaderValue::from_str(origin).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_topic_is_stable() {
        assert_eq!(DASHBOARD_TOPIC, "dashboard:global");
    }

    #[test]
    fn empty_allowed_origins_yields_permissive_default_layer() {
        let _layer = cors_layer(&[]);
    }

    #[test]
    fn configured_origins_build_a_layer() {
        let _layer = cors_layer(&["https://dashboard.example.com".to_string()]);
    }
}
