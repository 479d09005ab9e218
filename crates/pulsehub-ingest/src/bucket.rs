//! Aggregation buckets keyed by `(windowSec, bucketStart)`.

use std::collections::HashMap;

use serde::Serialize;

/// The fixed set of window sizes, in seconds, maintained by the aggregator.
pub const WINDOWS_SECS: [u64; 3] = [1, 5, 60];

/// How many bucket-widths back of the current bucket are retained before eviction.
pub const HORIZON_BUCKETS: i64 = 5;

/// Derive the bucket-start instant (ms since epoch) for receipt time `now_ms`
/// in a window of `window_secs` seconds.
///
/// `bucketStart = floor(now_ms / (window_secs * 1000)) * (window_secs * 1000)`.
#[must_use]
pub fn bucket_start(now_ms: i64, window_secs: u64) -> i64 {
    let width_ms = i64::try_from(window_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
    if width_ms == 0 {
        return now_ms;
    }
    now_ms.div_euclid(width_ms) * width_ms
}

/// An in-memory aggregation cell for one `(window, bucketStart)` pair.
///
/// Routes are tracked in an insertion-ordered map so that count ties break by
/// first-seen order when serialized, per the top-routes ordering rule.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    count: u64,
    uniques: std::collections::HashSet<String>,
    errors: u64,
    route_order: Vec<String>,
    route_counts: HashMap<String, u64>,
}

/// The top-N routes cap applied when serializing a bucket.
pub const TOP_ROUTES_LIMIT: usize = 10;

impl Bucket {
    /// Record one event's contribution to this bucket.
    pub fn record(&mut self, user_id: &str, route: &str, is_error: bool) {
        self.count += 1;
        if !user_id.is_empty() {
            self.uniques.insert(user_id.to_string());
        }
        if is_error {
            self.errors += 1;
        }
        if let Some(existing) = self.route_counts.get_mut(route) {
            *existing += 1;
        } else {
            self.route_counts.insert(route.to_string(), 1);
            self.route_order.push(route.to_string());
        }
    }

    /// Current total event count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Serialize this bucket to the wire shape, truncating routes to the top 10
    /// by count descending, ties broken by first-seen insertion order.
    #[must_use]
    pub fn serialize(&self) -> SerializedBucket {
        let mut routes: Vec<(String, u64)> = self
            .route_order
            .iter()
            .filter_map(|route| {
                self.route_counts
                    .get(route)
                    .map(|&count| (route.clone(), count))
            })
            .collect();
        // stable sort preserves first-seen order as the tiebreak.
        routes.sort_by(|a, b| b.1.cmp(&a.1));
        routes.truncate(TOP_ROUTES_LIMIT);

        SerializedBucket {
            count: self.count,
            uniques: u64::try_from(self.uniques.len()).unwrap_or(u64::MAX),
            routes,
            errors: self.errors,
        }
    }
}

/// The wire-shape serialization of a [`Bucket`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerializedBucket {
    pub count: u64,
    pub uniques: u64,
    pub routes: Vec<(String, u64)>,
    pub errors: u64,
}

impl SerializedBucket {
    /// The all-zero serialization for a window with no active bucket yet.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            count: 0,
            uniques: 0,
            routes: Vec::new(),
            errors: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_start_floors_to_window_width() {
        assert_eq!(bucket_start(1_700_000_000_123, 1), 1_700_000_000_000);
        assert_eq!(bucket_start(1_700_000_003_999, 5), 1_700_000_000_000);
    }

    #[test]
    fn record_tracks_count_uniques_errors() {
        let mut b = Bucket::default();
        b.record("u1", "/", false);
        b.record("u1", "/", false);
        b.record("", "/other", true);
        let s = b.serialize();
        assert_eq!(s.count, 3);
        assert_eq!(s.uniques, 1);
        assert_eq!(s.errors, 1);
    }

    #[test]
    fn routes_sum_to_count() {
        let mut b = Bucket::default();
        for route in ["/a", "/a", "/b", "/c", "/c", "/c"] {
            b.record("u1", route, false);
        }
        let s = b.serialize();
        let total: u64 = s.routes.iter().map(|(_, c)| c).sum();
        assert_eq!(total, s.count);
    }

    #[test]
    fn routes_sorted_descending_ties_first_seen() {
        let mut b = Bucket::default();
        for route in ["/a", "/a", "/a", "/a", "/a", "/b", "/b", "/b", "/c", "/c", "/c", "/c"] {
            b.record("u1", route, false);
        }
        let s = b.serialize();
        assert_eq!(
            s.routes,
            vec![
                ("/a".to_string(), 5),
                ("/c".to_string(), 4),
                ("/b".to_string(), 3),
            ]
        );
    }

    #[test]
    fn routes_truncated_to_top_ten() {
        let mut b = Bucket::default();
        for i in 0..15 {
            b.record("u1", &format!("/r{i}"), false);
        }
        let s = b.serialize();
        assert_eq!(s.routes.len(), TOP_ROUTES_LIMIT);
    }
}
