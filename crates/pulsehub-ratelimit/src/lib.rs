//! Coarse per-source-IP request rate limiting.
//!
//! A fixed-window counter keyed by source IP: each address gets a budget of
//! `limit` requests per rolling one-second window. This is a hardening
//! control (§4.7), not a core contract — callers that exceed their budget
//! are expected to receive a `429` and retry later, not to have their
//! request queued or delayed.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A fixed-window, per-IP request rate limiter.
///
/// Cheap to construct, intended to live behind a single `Arc` shared across
/// all request-endpoint connections. Internally a single mutex guards the
/// per-IP window map; contention is not a concern at the request volumes
/// this control is meant for (a coarse hardening cap, not a core path).
pub struct RateLimiter {
    limit_per_window: u32,
    window: Duration,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

struct Window {
    started_at: Instant,
    count: u32,
}

impl RateLimiter {
    /// Build a limiter allowing `limit_per_window` requests per source IP
    /// per rolling one-second window.
    #[must_use]
    pub fn new(limit_per_window: u32) -> Self {
        Self {
            limit_per_window,
            window: Duration::from_secs(1),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request from `addr` and report whether it falls within the
    /// budget. A stale window (older than the configured width) resets the
    /// counter rather than accumulating.
    #[must_use]
    pub fn check(&self, addr: IpAddr) -> bool {
        self.check_at(addr, Instant::now())
    }

    /// Same as [`Self::check`] with an explicit clock, for deterministic
    /// tests that don't sleep on the wall clock.
    #[must_use]
    pub fn check_at(&self, addr: IpAddr, now: Instant) -> bool {
        #[allow(clippy::expect_used)]
        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");

        // Opportunistic cleanup: bound memory for a long-running process
        // fielding traffic from many distinct source addresses.
        if windows.len() > 100_000 {
            windows.retain(|_, w| now.duration_since(w.started_at) < self.window * 2);
        }

        let entry = windows.entry(addr).or_insert_with(|| Window {
            started_at: now,
            count: 0,
        });

        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= self.limit_per_window {
            return false;
        }

        entry.count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    }

    #[test]
    fn allows_up_to_the_limit() {
        let limiter = RateLimiter::new(3);
        let now = Instant::now();
        assert!(limiter.check_at(addr(), now));
        assert!(limiter.check_at(addr(), now));
        assert!(limiter.check_at(addr(), now));
        assert!(!limiter.check_at(addr(), now));
    }

    #[test]
    fn resets_after_window_elapses() {
        let limiter = RateLimiter::new(1);
        let now = Instant::now();
        assert!(limiter.check_at(addr(), now));
        assert!(!limiter.check_at(addr(), now));
        let later = now + Duration::from_millis(1001);
        assert!(limiter.check_at(addr(), later));
    }

    #[test]
    fn tracks_distinct_addresses_independently() {
        let limiter = RateLimiter::new(1);
        let now = Instant::now();
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        assert!(limiter.check_at(a, now));
        assert!(limiter.check_at(b, now));
        assert!(!limiter.check_at(a, now));
    }
}
