//! Health and readiness endpoints.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use pulsehub_store::Store;
use serde::Serialize;
use tracing::instrument;

use crate::state::AppState;

/// State subset needed by the health/readiness handlers.
#[derive(Clone)]
pub struct HealthState {
    pub store: Store,
}

#[derive(Debug, Serialize)]
struct OkBody {
    ok: bool,
}

/// `GET /health` — always `{ok: true}` while the process is alive.
#[instrument(name = "handler.health")]
pub async fn health() -> impl IntoResponse {
    Json(OkBody { ok: true })
}

/// `GET /ready` — `{ok: true}` iff the persistence backend answers a
/// liveness probe; otherwise a server-error status with `{ok: false}`.
#[instrument(name = "handler.ready", skip(state))]
pub async fn ready(State(state): State<HealthState>) -> impl IntoResponse {
    if state.store.ping().await {
        (StatusCode::OK, Json(OkBody { ok: true }))
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(OkBody { ok: false }))
    }
}

/// Health/readiness routes, mountable on the request router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_always_ok() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
