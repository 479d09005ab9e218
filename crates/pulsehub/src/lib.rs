//! Real-time event ingestion and fan-out service for a lightweight analytics dashboard.
//!
//! This crate wires together the workspace's ingestion (`pulsehub-ingest`),
//! fan-out (`pulsehub-bus`), persistence (`pulsehub-store`), auth
//! (`pulsehub-auth`), and rate-limiting (`pulsehub-ratelimit`) crates behind
//! two HTTP routers: a request/response endpoint and a persistent streaming
//! endpoint.
//!
//! - `config`: application configuration from environment variables
//! - `metrics`: Prometheus recorder and the service's named counters/gauges
//! - `presentation`: HTTP/WebSocket routes, handlers, and error responses
//! - `state`: application state container with `FromRef` implementations
//! - `janitor`: periodic eviction of out-of-horizon aggregation buckets

pub mod config;
pub mod janitor;
pub mod metrics;
pub mod presentation;
pub mod state;
