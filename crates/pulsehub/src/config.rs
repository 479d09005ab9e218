//! Application configuration loaded from environment variables.
//!
//! Every variable is parsed independently via [`Config::from_env`]: invalid
//! values are logged at `warn` and replaced by their documented default,
//! never a silent panic. A missing `MONGODB_URI` or `JWT_SECRET` is a
//! startup-fatal configuration error, since the service has no sensible
//! default for either — see [`Config::from_env`]'s `Err` case.

use std::env;
use std::net::SocketAddr;

/// Default base port for the request endpoint; the streaming endpoint binds
/// to this port plus one.
pub const DEFAULT_PORT: u16 = 4000;

/// Default raw-event TTL, in days.
pub const DEFAULT_RAW_EVENTS_TTL_DAYS: u64 = 7;

/// Default inbound frame / request body size cap, in bytes.
pub const DEFAULT_MAX_MSG_BYTES: usize = 32_768;

/// Default per-source-IP request budget for `POST /ingest`.
pub const DEFAULT_REQUEST_RATE_LIMIT_PER_SEC: u32 = 20;

/// Default per-subscriber outstanding-bytes backpressure cutoff.
pub const DEFAULT_BACKPRESSURE_BYTES: usize = 1_048_576;

/// Default bucket janitor sweep interval, in seconds.
pub const DEFAULT_JANITOR_INTERVAL_SECS: u64 = 5;

/// Immutable application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base port; the request endpoint binds here.
    pub port: u16,
    /// MongoDB connection string.
    pub mongodb_uri: String,
    /// Shared HMAC secret for bearer credential signing/verification.
    pub jwt_secret: String,
    /// Allowed CORS origins for the request endpoint.
    pub allowed_origins: Vec<String>,
    /// Raw-event TTL, in days.
    pub raw_events_ttl_days: u64,
    /// Inbound frame / request body size cap, in bytes.
    pub max_msg_bytes: usize,
    /// Per-source-IP request budget for `POST /ingest`, per second.
    pub request_rate_limit_per_sec: u32,
    /// Per-subscriber outstanding-bytes backpressure cutoff.
    pub backpressure_bytes: usize,
    /// Bucket janitor sweep interval, in seconds.
    pub janitor_interval_secs: u64,
}

/// A missing required variable: the service cannot do anything meaningful
/// without it, so startup refuses to proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingRequiredVar(pub &'static str);

impl std::fmt::Display for MissingRequiredVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "missing required environment variable: {}", self.0)
    }
}

impl std::error::Error for MissingRequiredVar {}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`MissingRequiredVar`] if `MONGODB_URI` or `JWT_SECRET` is
    /// unset — both are required and have no sensible default.
    pub fn from_env() -> Result<Self, MissingRequiredVar> {
        let mongodb_uri =
            env::var("MONGODB_URI").map_err(|_| MissingRequiredVar("MONGODB_URI"))?;
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| MissingRequiredVar("JWT_SECRET"))?;

        Ok(Self {
            port: parse_or_default("PORT", DEFAULT_PORT),
            mongodb_uri,
            jwt_secret,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            raw_events_ttl_days: parse_or_default(
                "RAW_EVENTS_TTL_DAYS",
                DEFAULT_RAW_EVENTS_TTL_DAYS,
            ),
            max_msg_bytes: parse_or_default("MAX_MSG_BYTES", DEFAULT_MAX_MSG_BYTES),
            request_rate_limit_per_sec: parse_or_default(
                "REQUEST_RATE_LIMIT_PER_SEC",
                DEFAULT_REQUEST_RATE_LIMIT_PER_SEC,
            ),
            backpressure_bytes: parse_or_default("BACKPRESSURE_BYTES", DEFAULT_BACKPRESSURE_BYTES),
            janitor_interval_secs: parse_or_default(
                "JANITOR_INTERVAL_SECS",
                DEFAULT_JANITOR_INTERVAL_SECS,
            ),
        })
    }

    /// The request endpoint's socket address (`PORT`).
    #[must_use]
    pub fn request_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// The streaming endpoint's socket address (`PORT + 1`).
    #[must_use]
    pub fn streaming_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port.saturating_add(1)))
    }
}

fn parse_or_default<T: std::str::FromStr>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(variable = var, value = %raw, "invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_and_streaming_addrs_are_adjacent_ports() {
        let config = Config {
            port: 4000,
            mongodb_uri: "mongodb://localhost".to_string(),
            jwt_secret: "secret".to_string(),
            allowed_origins: Vec::new(),
            raw_events_ttl_days: DEFAULT_RAW_EVENTS_TTL_DAYS,
            max_msg_bytes: DEFAULT_MAX_MSG_BYTES,
            request_rate_limit_per_sec: DEFAULT_REQUEST_RATE_LIMIT_PER_SEC,
            backpressure_bytes: DEFAULT_BACKPRESSURE_BYTES,
            janitor_interval_secs: DEFAULT_JANITOR_INTERVAL_SECS,
        };
        assert_eq!(config.request_addr().port(), 4000);
        assert_eq!(config.streaming_addr().port(), 4001);
    }

    #[test]
    fn missing_required_var_display() {
        let err = MissingRequiredVar("JWT_SECRET");
        assert_eq!(
            err.to_string(),
            "missing required environment variable: JWT_SECRET"
        );
    }
}
