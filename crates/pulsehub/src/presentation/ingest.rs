//! Batch event ingestion over the request/response transport.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use chrono::Utc;
use pulsehub_core::ServiceError;
use pulsehub_ingest::{AggSnapshot, Event, RawEvent, validate_batch};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::metrics as app_metrics;
use crate::presentation::DASHBOARD_TOPIC;
use crate::presentation::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct AcceptedBody {
    accepted: usize,
}

#[derive(Debug, Deserialize)]
struct TokenParams {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssueTokenParams {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

/// Default subject used by `GET /token` when `userId` is absent.
const DEFAULT_TOKEN_SUBJECT: &str = "dashboard";

fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    token: Option<&str>,
) -> Result<(), AppError> {
    let header_value = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let credential = pulsehub_auth::AuthVerifier::resolve_credential(header_value, token);
    let identity = credential.and_then(|c| state.auth.verify(c));
    if identity.is_some() {
        Ok(())
    } else {
        Err(ServiceError::unauthorized("missing or invalid credential").into())
    }
}

/// `POST /ingest` — accepts a single event object or an array of event objects.
#[instrument(name = "handler.ingest", skip(state, headers, body))]
async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<TokenParams>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    authenticate(&state, &headers, params.token.as_deref())?;

    let raw = match body {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| serde_json::from_value::<RawEvent>(v).ok())
            .collect::<Vec<_>>(),
        Value::Null => Vec::new(),
        single => serde_json::from_value::<RawEvent>(single)
            .map(|e| vec![e])
            .unwrap_or_default(),
    };

    if raw.is_empty() {
        return Err(AppError::empty_payload());
    }

    let submitted = raw.len();
    let events = validate_batch(raw);
    if events.is_empty() {
        metrics::counter!(app_metrics::DROPPED_EVENTS_TOTAL)
            .increment(u64::try_from(submitted).unwrap_or(u64::MAX));
        return Err(AppError::no_valid_events());
    }

    let dropped = submitted - events.len();
    if dropped > 0 {
        metrics::counter!(app_metrics::DROPPED_EVENTS_TOTAL)
            .increment(u64::try_from(dropped).unwrap_or(u64::MAX));
    }

    let accepted = events.len();
    let now_ms = Utc::now().timestamp_millis();
    let snapshot = state.aggregator.ingest(&events, now_ms);
    metrics::counter!(app_metrics::INGESTED_EVENTS_TOTAL)
        .increment(u64::try_from(accepted).unwrap_or(u64::MAX));

    let error_count = u64::try_from(events.iter().filter(|e| e.is_error()).count()).unwrap_or(u64::MAX);
    spawn_persistence(state.clone(), events, now_ms, error_count);
    broadcast_delta(&state, &snapshot);

    Ok(Json(AcceptedBody { accepted }))
}

fn spawn_persistence(state: AppState, events: Vec<Event>, now_ms: i64, error_count: u64) {
    let batch_len = u64::try_from(events.len()).unwrap_or(u64::MAX);
    tokio::spawn(async move {
        let started = std::time::Instant::now();
        if let Err(e) = state.store.insert_raw_events(&events).await {
            debug!(
                error_id = %e.error_id(),
                error_code = ?e.error_code(),
                "raw event insert failed, swallowing"
            );
        }
        metrics::histogram!(app_metrics::PERSISTENCE_OP_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        let started = std::time::Instant::now();
        if let Err(e) = state
            .store
            .upsert_aggregates(now_ms, batch_len, error_count)
            .await
        {
            debug!(
                error_id = %e.error_id(),
                error_code = ?e.error_code(),
                "aggregate upsert failed, swallowing"
            );
        }
        metrics::histogram!(app_metrics::PERSISTENCE_OP_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
    });
}

/// Serialize `snapshot` as an `agg_delta` frame and broadcast it to the
/// dashboard topic, updating fan-out metrics along the way.
pub(crate) fn broadcast_delta(state: &AppState, snapshot: &AggSnapshot) {
    let frame = serde_json::json!({"type": "agg_delta", "data": snapshot});
    let Ok(bytes) = serde_json::to_vec(&frame) else {
        warn!("failed to serialize agg_delta frame");
        return;
    };
    let stats = state
        .registry
        .broadcast(DASHBOARD_TOPIC, Arc::from(bytes.into_boxed_slice()));
    metrics::counter!(app_metrics::BROADCAST_DELTAS_TOTAL).increment(1);
    if stats.skipped > 0 {
        metrics::counter!(app_metrics::BACKPRESSURE_DROPS_TOTAL)
            .increment(u64::try_from(stats.skipped).unwrap_or(u64::MAX));
    }
    #[allow(clippy::as_conversions)]
    metrics::gauge!(app_metrics::SUBSCRIBERS).set(state.registry.subscriber_count(DASHBOARD_TOPIC) as f64);
}

/// `GET /token?userId=<s>` — dev-convenience credential issuance.
#[instrument(name = "handler.issue_token", skip(state))]
async fn issue_token(
    State(state): State<AppState>,
    Query(params): Query<IssueTokenParams>,
) -> Result<impl IntoResponse, AppError> {
    let subject = params
        .user_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TOKEN_SUBJECT.to_string());
    let token = state.auth.issue_dev_token(&subject).map_err(|e| {
        ServiceError::new(pulsehub_core::ServiceErrorKind::Internal {
            detail: e.to_string(),
        })
    })?;
    Ok(Json(serde_json::json!({ "token": token })))
}

/// Ingestion and dev-token routes, mountable on the request router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ingest", post(ingest))
        .route("/token", get(issue_token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_subject_is_dashboard() {
        assert_eq!(DEFAULT_TOKEN_SUBJECT, "dashboard");
    }
}
