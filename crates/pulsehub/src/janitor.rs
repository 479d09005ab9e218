//! Periodic eviction of out-of-horizon in-memory aggregation buckets.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pulsehub_ingest::Aggregator;
use tokio::sync::watch;
use tracing::debug;

/// Run the bucket janitor: every `interval`, evict buckets whose
/// `bucketStart` falls outside the aggregator's horizon, until `shutdown`
/// fires.
///
/// Intended to be spawned once at startup and left running for the life of
/// the process; cancellation is cooperative via the `shutdown` receiver
/// rather than an abort, so an in-flight sweep always completes.
pub async fn run(aggregator: Arc<Aggregator>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now_ms = Utc::now().timestamp_millis();
                aggregator.evict_before_horizon(now_ms);
                debug!("janitor sweep complete");
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    debug!("janitor shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stops_when_shutdown_signalled() {
        let aggregator = Arc::new(Aggregator::new());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(run(aggregator, Duration::from_millis(5), rx));
        tx.send(true).expect("receiver still alive");

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("janitor task should exit promptly after shutdown signal")
            .expect("janitor task should not panic");
    }
}
