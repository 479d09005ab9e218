//! In-memory rolling-window aggregator.
//!
//! Maintains one bucket map per window size. Each map is guarded by its own
//! mutex (one lock per window, per the concurrency model's "either a single
//! lock... or one lock per window map" allowance) so that ingestion into one
//! window never contends with eviction of another.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

use crate::bucket::{bucket_start, Bucket, SerializedBucket, HORIZON_BUCKETS, WINDOWS_SECS};
use crate::event::Event;

struct WindowState {
    window_secs: u64,
    buckets: Mutex<BTreeMap<i64, Bucket>>,
}

/// The rolling-window aggregator. Cheap to construct, intended to live behind
/// a single `Arc` shared across all ingestion paths and the bucket janitor.
pub struct Aggregator {
    windows: [WindowState; 3],
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    /// Build a fresh aggregator with empty bucket maps for every configured window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            windows: WINDOWS_SECS.map(|window_secs| WindowState {
                window_secs,
                buckets: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Apply a batch of already-validated events at receipt time `now_ms`,
    /// updating every window's active bucket, and return the resulting
    /// per-window snapshot.
    #[allow(clippy::expect_used)]
    pub fn ingest(&self, events: &[Event], now_ms: i64) -> AggSnapshot {
        let mut serialized = [SerializedBucket::empty(), SerializedBucket::empty(), SerializedBucket::empty()];
        for (i, window) in self.windows.iter().enumerate() {
            let start = bucket_start(now_ms, window.window_secs);
            let mut buckets = window
                .buckets
                .lock()
                .expect("aggregator bucket map mutex poisoned");
            let bucket = buckets.entry(start).or_default();
            for event in events {
                bucket.record(&event.user_id, &event.route, event.is_error());
            }
            serialized[i] = bucket.serialize();
        }
        AggSnapshot::from_array(serialized)
    }

    /// Compute the current per-window snapshot without ingesting new events.
    /// A window with no active bucket yet serializes to an all-zero snapshot.
    #[allow(clippy::expect_used)]
    pub fn snapshot(&self, now_ms: i64) -> AggSnapshot {
        let mut serialized = [SerializedBucket::empty(), SerializedBucket::empty(), SerializedBucket::empty()];
        for (i, window) in self.windows.iter().enumerate() {
            let start = bucket_start(now_ms, window.window_secs);
            let buckets = window
                .buckets
                .lock()
                .expect("aggregator bucket map mutex poisoned");
            serialized[i] = buckets.get(&start).map_or_else(SerializedBucket::empty, Bucket::serialize);
        }
        AggSnapshot::from_array(serialized)
    }

    /// Evict every bucket across every window whose `bucketStart` falls
    /// outside the five-bucket horizon as of `now_ms`. Safe to run
    /// concurrently with ingestion: eviction only ever removes keys strictly
    /// older than the horizon, so it cannot race with updates to the
    /// currently-active bucket.
    #[allow(clippy::expect_used)]
    pub fn evict_before_horizon(&self, now_ms: i64) {
        for window in &self.windows {
            let width_ms = i64::try_from(window.window_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
            let cutoff = now_ms - HORIZON_BUCKETS * width_ms;
            let mut buckets = window
                .buckets
                .lock()
                .expect("aggregator bucket map mutex poisoned");
            let before = buckets.len();
            buckets.retain(|&start, _| start >= cutoff);
            let evicted = before - buckets.len();
            if evicted > 0 {
                debug!(window_secs = window.window_secs, evicted, "janitor evicted out-of-horizon buckets");
            }
        }
    }
}

/// A `{"1s": ..., "5s": ..., "60s": ...}` snapshot, shared between `agg_snapshot`
/// and `agg_delta` frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggSnapshot {
    #[serde(rename = "1s")]
    pub one_s: SerializedBucket,
    #[serde(rename = "5s")]
    pub five_s: SerializedBucket,
    #[serde(rename = "60s")]
    pub sixty_s: SerializedBucket,
}

impl AggSnapshot {
    fn from_array([one_s, five_s, sixty_s]: [SerializedBucket; 3]) -> Self {
        Self {
            one_s,
            five_s,
            sixty_s,
        }
    }
}
