//! Event validation and rolling time-window aggregation.
//!
//! This crate owns the in-memory half of the ingestion pipeline: shape-checking
//! raw event records, and maintaining sliding per-window buckets keyed by
//! receipt-time bucket start. Persistence and fan-out live in sibling crates.

pub mod aggregator;
pub mod bucket;
pub mod event;
pub mod validator;

pub use aggregator::{AggSnapshot, Aggregator};
pub use bucket::{bucket_start, Bucket, SerializedBucket, WINDOWS_SECS};
pub use event::{Event, RawEvent};
pub use validator::validate_batch;
