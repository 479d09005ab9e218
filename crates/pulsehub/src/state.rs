//! Application state shared across HTTP and streaming handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use metrics_exporter_prometheus::PrometheusHandle;
use pulsehub_auth::AuthVerifier;
use pulsehub_bus::TopicRegistry;
use pulsehub_ingest::Aggregator;
use pulsehub_ratelimit::RateLimiter;
use pulsehub_store::Store;

use crate::config::Config;
use crate::presentation::health::HealthState;
use crate::presentation::metrics::MetricsState;

/// Central application state, shared across the request router, the
/// streaming router, and the bucket janitor task.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub registry: Arc<TopicRegistry>,
    pub store: Store,
    pub auth: Arc<AuthVerifier>,
    pub rate_limiter: Arc<RateLimiter>,
    pub config: Arc<Config>,
    pub prometheus_handle: PrometheusHandle,
}

impl AppState {
    #[must_use]
    pub fn new(config: Arc<Config>, store: Store, prometheus_handle: PrometheusHandle) -> Self {
        let auth = Arc::new(AuthVerifier::new(&config.jwt_secret));
        let rate_limiter = Arc::new(RateLimiter::new(config.request_rate_limit_per_sec));
        let registry = Arc::new(TopicRegistry::new(config.backpressure_bytes));
        Self {
            aggregator: Arc::new(Aggregator::new()),
            registry,
            store,
            auth,
            rate_limiter,
            config,
            prometheus_handle,
        }
    }
}

impl FromRef<AppState> for HealthState {
    fn from_ref(app_state: &AppState) -> Self {
        HealthState {
            store: app_state.store.clone(),
        }
    }
}

impl FromRef<AppState> for MetricsState {
    fn from_ref(app_state: &AppState) -> Self {
        MetricsState {
            prometheus_handle: app_state.prometheus_handle.clone(),
        }
    }
}
