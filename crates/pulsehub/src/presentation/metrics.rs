//! Prometheus metrics scrape endpoint, mounted on the request endpoint's router.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::instrument;

use crate::state::AppState;

/// State subset needed by the metrics handler.
#[derive(Clone)]
pub struct MetricsState {
    pub prometheus_handle: PrometheusHandle,
}

/// `GET /metrics` — Prometheus text exposition format.
#[instrument(name = "handler.metrics", skip(state))]
pub async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    let body = state.prometheus_handle.render();
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

/// Metrics route, mountable on the request router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}
