//! Persistent bidirectional streaming endpoint, mounted on its own port.

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use pulsehub_auth::{AuthVerifier, Identity, new_connection_id};
use pulsehub_bus::ConnectionId;
use pulsehub_ingest::{RawEvent, validate_batch};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::metrics as app_metrics;
use crate::presentation::ingest::broadcast_delta;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct WsQueryParams {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InboundFrame {
    Subscribe { topic: String },
    Events { events: Vec<RawEvent> },
}

/// `GET /ws` — upgrades to a persistent bidirectional session.
///
/// A missing or invalid credential closes the socket immediately with a
/// policy-violation close code and no further frames, per the auth gate.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsQueryParams>,
    headers: HeaderMap,
) -> Response {
    let header_value = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let credential = AuthVerifier::resolve_credential(header_value, params.token.as_deref());
    let identity = credential.and_then(|c| state.auth.verify(c));

    match identity {
        Some(identity) => ws.on_upgrade(move |socket| handle_socket(socket, state, identity)),
        None => ws.on_upgrade(|socket| close_unauthenticated(socket)),
    }
}

async fn close_unauthenticated(mut socket: WebSocket) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: "missing or invalid credential".into(),
        })))
        .await;
}

#[instrument(name = "streaming.session", skip(socket, state), fields(connection_id))]
async fn handle_socket(socket: WebSocket, state: AppState, identity: Identity) {
    let connection_id = new_connection_id();
    tracing::Span::current().record("connection_id", tracing::field::display(connection_id));
    info!(subject = %identity.subject, "streaming session opened");
    metrics::gauge!(app_metrics::WEBSOCKET_CONNECTIONS).increment(1.0);

    let registration = state.registry.register(connection_id);
    let (mut sender, mut receiver) = socket.split();
    let mut outbound = registration.receiver;
    let outstanding = registration.outstanding;

    let send_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let len = frame.len();
            #[allow(clippy::expect_used)]
            let text = String::from_utf8(frame.bytes.to_vec()).expect("frames are always UTF-8 JSON");
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
            outstanding.fetch_sub(len, std::sync::atomic::Ordering::Relaxed);
        }
    });

    let max_msg_bytes = state.config.max_msg_bytes;
    let recv_state = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    if text.len() > max_msg_bytes {
                        warn!(%connection_id, size = text.len(), "oversized streaming frame ignored");
                        continue;
                    }
                    handle_inbound(&text, connection_id, &recv_state).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }

    state.registry.unsubscribe_all(connection_id);
    metrics::gauge!(app_metrics::WEBSOCKET_CONNECTIONS).decrement(1.0);
    info!(%connection_id, "streaming session closed");
}

async fn handle_inbound(text: &str, connection_id: ConnectionId, state: &AppState) {
    let frame = match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) => frame,
        Err(_) => {
            debug!(%connection_id, "unparseable or unrecognized streaming frame ignored");
            return;
        }
    };

    match frame {
        InboundFrame::Subscribe { topic } => {
            let snapshot = state.aggregator.snapshot(Utc::now().timestamp_millis());
            let payload = serde_json::json!({"type": "agg_snapshot", "data": snapshot});
            if let Ok(bytes) = serde_json::to_vec(&payload) {
                state
                    .registry
                    .send_to(connection_id, Arc::from(bytes.into_boxed_slice()));
            }
            // Joining the topic after the snapshot is enqueued guarantees the
            // subscriber's first frame is the snapshot; a delta broadcast in
            // this gap is simply missed, same as any other backpressure drop.
            state.registry.subscribe(connection_id, &topic);
        }
        InboundFrame::Events { events: raw } => {
            if raw.is_empty() {
                return;
            }
            let events = validate_batch(raw);
            if events.is_empty() {
                return;
            }
            let now_ms = Utc::now().timestamp_millis();
            let snapshot = state.aggregator.ingest(&events, now_ms);
            metrics::counter!(app_metrics::INGESTED_EVENTS_TOTAL)
                .increment(u64::try_from(events.len()).unwrap_or(u64::MAX));

            let error_count = u64::try_from(events.iter().filter(|e| e.is_error()).count()).unwrap_or(u64::MAX);
            let batch_len = u64::try_from(events.len()).unwrap_or(u64::MAX);
            let store = state.store.clone();
            tokio::spawn(async move {
                if let Err(e) = store.insert_raw_events(&events).await {
                    debug!(error_id = %e.error_id(), "raw event insert failed, swallowing");
                }
                if let Err(e) = store.upsert_aggregates(now_ms, batch_len, error_count).await {
                    debug!(error_id = %e.error_id(), "aggregate upsert failed, swallowing");
                }
            });

            broadcast_delta(state, &snapshot);
        }
    }
}

/// Streaming route, mounted on its own router bound to the streaming port.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_frame_parses() {
        let frame: InboundFrame =
            serde_json::from_str(r#"{"type":"subscribe","topic":"dashboard:global"}"#).unwrap();
        assert!(matches!(frame, InboundFrame::Subscribe { topic } if topic == "dashboard:global"));
    }

    #[test]
    fn events_frame_parses() {
        let frame: InboundFrame = serde_json::from_str(
            r#"{"type":"events","events":[{"eventId":"A","ts":1,"sessionId":"s","route":"/","action":"view"}]}"#,
        )
        .unwrap();
        assert!(matches!(frame, InboundFrame::Events { events } if events.len() == 1));
    }

    #[test]
    fn unknown_frame_type_fails_to_parse() {
        let result = serde_json::from_str::<InboundFrame>(r#"{"type":"ping"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn non_object_payload_fails_to_parse() {
        let result = serde_json::from_str::<InboundFrame>("not json");
        assert!(result.is_err());
    }
}
