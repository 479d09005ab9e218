//! Idempotent durable persistence of raw events and aggregate checkpoints.
//!
//! Backed by MongoDB: raw events are inserted unordered so a duplicate
//! `eventId` never aborts the rest of a batch, and aggregate checkpoints are
//! upserted by `(window, bucketStart)`. Nothing here sits on the critical
//! path of an ingestion response — every persistence failure is logged and
//! swallowed by the caller.

pub mod error;
pub mod store;

pub use error::{StoreError, StoreErrorKind};
pub use store::{AggregateDoc, Store, DEFAULT_DB_NAME};
