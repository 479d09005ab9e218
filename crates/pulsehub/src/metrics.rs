//! Prometheus metrics recorder and the service's named counters/gauges.
//!
//! Initializes the `metrics` facade with a Prometheus exporter recorder and
//! exposes a handle for rendering the Prometheus text exposition format at
//! `/metrics`, on the request endpoint's router only.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Count of events accepted by the validator and handed to the aggregator.
pub const INGESTED_EVENTS_TOTAL: &str = "pulsehub_ingested_events_total";

/// Count of records dropped by the validator for failing a shape rule.
pub const DROPPED_EVENTS_TOTAL: &str = "pulsehub_dropped_events_total";

/// Count of per-window delta payloads broadcast to the dashboard topic.
pub const BROADCAST_DELTAS_TOTAL: &str = "pulsehub_broadcast_deltas_total";

/// Current subscriber count on the dashboard topic.
pub const SUBSCRIBERS: &str = "pulsehub_subscribers";

/// Count of broadcasts skipped because a subscriber was backpressured.
pub const BACKPRESSURE_DROPS_TOTAL: &str = "pulsehub_backpressure_drops_total";

/// Duration of a persistence operation (raw insert or aggregate upsert), in seconds.
pub const PERSISTENCE_OP_DURATION_SECONDS: &str = "pulsehub_persistence_op_duration_seconds";

/// Current count of open streaming (WebSocket) connections.
pub const WEBSOCKET_CONNECTIONS: &str = "pulsehub_websocket_connections";

/// Initialize the Prometheus metrics recorder and return a handle for rendering.
///
/// Must be called exactly once during application startup, before any
/// metrics are emitted.
///
/// # Errors
///
/// Returns an error if a global recorder has already been installed.
pub fn init_prometheus_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_counter!(
        INGESTED_EVENTS_TOTAL,
        metrics::Unit::Count,
        "Total number of events accepted by the validator"
    );
    metrics::describe_counter!(
        DROPPED_EVENTS_TOTAL,
        metrics::Unit::Count,
        "Total number of records dropped for failing a shape rule"
    );
    metrics::describe_counter!(
        BROADCAST_DELTAS_TOTAL,
        metrics::Unit::Count,
        "Total number of per-window delta payloads broadcast"
    );
    metrics::describe_gauge!(
        SUBSCRIBERS,
        metrics::Unit::Count,
        "Current subscriber count on the dashboard topic"
    );
    metrics::describe_counter!(
        BACKPRESSURE_DROPS_TOTAL,
        metrics::Unit::Count,
        "Total number of broadcasts skipped for a backpressured subscriber"
    );
    metrics::describe_histogram!(
        PERSISTENCE_OP_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Duration of a persistence operation in seconds"
    );
    metrics::describe_gauge!(
        WEBSOCKET_CONNECTIONS,
        metrics::Unit::Count,
        "Current count of open streaming connections"
    );
}

/// Build a non-global Prometheus handle for testing.
///
/// Safe to use in tests that run in parallel within the same process since
/// it never touches the global recorder.
#[doc(hidden)]
pub fn test_prometheus_handle() -> PrometheusHandle {
    let recorder = PrometheusBuilder::new().build_recorder();
    recorder.handle()
}
