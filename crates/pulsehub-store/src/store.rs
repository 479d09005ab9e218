//! MongoDB-backed persistence: idempotent raw-event insert and aggregate upsert.

use std::time::Duration;

use bson::doc;
use mongodb::error::ErrorKind;
use mongodb::options::{IndexOptions, UpdateModifications};
use mongodb::{Client, Collection, Database, IndexModel};
use pulsehub_ingest::{bucket_start, Event, WINDOWS_SECS};
use tracing::debug;

use crate::error::StoreError;

/// Default database name used when the connection string carries none.
pub const DEFAULT_DB_NAME: &str = "pulsehub";

const RAW_EVENTS_COLLECTION: &str = "raw_events";
const AGGREGATES_COLLECTION: &str = "aggregates";

/// A persisted aggregate checkpoint: coarser than the in-memory bucket (no
/// uniques, no per-route breakdown), kept only for durability and
/// cross-restart continuity of headline counters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AggregateDoc {
    pub window: i64,
    #[serde(rename = "bucketStart")]
    pub bucket_start: i64,
    pub count: i64,
    pub errors: i64,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

/// The persistence adapter: holds long-lived handles to the raw-event and
/// aggregate collections. Cheap to clone (the underlying driver handles are
/// themselves `Arc`-backed); intended to live behind a single instance
/// shared across all ingestion paths.
#[derive(Clone)]
pub struct Store {
    database: Database,
    raw_events: Collection<Event>,
    aggregates: Collection<AggregateDoc>,
}

impl Store {
    /// Connect to MongoDB at `uri`. This is the one persistence operation
    /// whose failure is startup-fatal: without a reachable backend the
    /// service has no meaningful work to do.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the initial connection cannot be established.
    pub async fn connect(uri: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DB_NAME));
        let raw_events = database.collection::<Event>(RAW_EVENTS_COLLECTION);
        let aggregates = database.collection::<AggregateDoc>(AGGREGATES_COLLECTION);
        Ok(Self {
            database,
            raw_events,
            aggregates,
        })
    }

    /// Ensure every index this adapter depends on exists, creating or
    /// recreating as needed. Idempotent across restarts and tolerant of
    /// concurrent create races from other process instances.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only for failures that aren't themselves index
    /// conflicts or races — those are logged at `debug` and swallowed.
    pub async fn init(&self, raw_events_ttl_days: u64) -> Result<(), StoreError> {
        self.ensure_ttl_index(raw_events_ttl_days).await;
        self.ensure_index(&self.raw_events, doc! { "sessionId": 1 }, "sessionId_idx", false)
            .await;
        self.ensure_index(&self.raw_events, doc! { "userId": 1 }, "userId_idx", false)
            .await;
        self.ensure_index(&self.raw_events, doc! { "route": 1 }, "route_idx", false)
            .await;
        self.ensure_index(&self.raw_events, doc! { "eventId": 1 }, "eventId_unique", true)
            .await;
        self.ensure_index(
            &self.aggregates,
            doc! { "window": 1, "bucketStart": 1 },
            "window_bucketStart_unique",
            true,
        )
        .await;
        Ok(())
    }

    async fn ensure_index<T>(
        &self,
        collection: &Collection<T>,
        keys: bson::Document,
        name: &str,
        unique: bool,
    ) where
        T: Send + Sync,
    {
        let options = IndexOptions::builder()
            .name(name.to_string())
            .unique(unique)
            .build();
        let model = IndexModel::builder().keys(keys).options(options).build();
        if let Err(e) = collection.create_index(model).await {
            // Index already exists with compatible options, or another
            // process instance is racing us to create the same one.
            // Either way this is not fatal; record it for diagnosis.
            debug!(index = name, error = %e, "index ensure swallowed");
        }
    }

    async fn ensure_ttl_index(&self, ttl_days: u64) {
        let ttl = Duration::from_secs(ttl_days.saturating_mul(86_400));
        let options = IndexOptions::builder()
            .name("ts_ttl".to_string())
            .expire_after(ttl)
            .build();
        let model = IndexModel::builder()
            .keys(doc! { "ts": 1 })
            .options(options)
            .build();
        if let Err(e) = self.raw_events.create_index(model).await {
            // A pre-existing TTL index with a different expiry reports an
            // index-options-conflict (code 85); drop and recreate so the
            // configured TTL always wins on restart.
            debug!(error = %e, "ts_ttl index create failed, attempting drop and recreate");
            if self.raw_events.drop_index("ts_ttl").await.is_ok() {
                let retry_options = IndexOptions::builder()
                    .name("ts_ttl".to_string())
                    .expire_after(ttl)
                    .build();
                let retry_model = IndexModel::builder()
                    .keys(doc! { "ts": 1 })
                    .options(retry_options)
                    .build();
                if let Err(e) = self.raw_events.create_index(retry_model).await {
                    debug!(error = %e, "ts_ttl index recreate swallowed");
                }
            }
        }
    }

    /// Insert a validated batch of events, unordered so one duplicate
    /// `eventId` doesn't abort the rest of the batch. Duplicate-key
    /// conflicts are expected idempotency tolerances and resolve to `Ok`;
    /// any other failure is returned for the caller to log and swallow,
    /// since persistence is never on the critical path of the ingestion
    /// response.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] for any insert failure other than a
    /// duplicate `eventId`.
    pub async fn insert_raw_events(&self, events: &[Event]) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }
        match self.raw_events.insert_many(events).ordered(false).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key_only(&e) => {
                debug!("raw event insert: duplicate eventId(s) ignored");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Upsert the per-window aggregate checkpoint for a batch ingested at
    /// receipt time `now_ms`, incrementing `count` by `batch_len` and
    /// `errors` by `error_count` for each window's active bucket.
    ///
    /// # Errors
    ///
    /// Returns the first window's [`StoreError`] encountered; remaining
    /// windows are still attempted so one backend hiccup doesn't skip the
    /// others' checkpoints.
    pub async fn upsert_aggregates(
        &self,
        now_ms: i64,
        batch_len: u64,
        error_count: u64,
    ) -> Result<(), StoreError> {
        let mut first_error = None;
        for window_secs in WINDOWS_SECS {
            let start = bucket_start(now_ms, window_secs);
            let filter = doc! {
                "window": i64::from(u32::try_from(window_secs).unwrap_or(u32::MAX)),
                "bucketStart": start,
            };
            #[allow(clippy::as_conversions)]
            let update = doc! {
                "$inc": {
                    "count": batch_len as i64,
                    "errors": error_count as i64,
                },
                "$setOnInsert": { "createdAt": start },
            };
            if let Err(e) = self
                .aggregates
                .update_one(filter, UpdateModifications::Document(update))
                .upsert(true)
                .await
            {
                first_error.get_or_insert(StoreError::from(e));
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// A liveness probe used by the readiness endpoint: succeeds iff the
    /// backend responds to a ping.
    pub async fn ping(&self) -> bool {
        self.database.run_command(doc! { "ping": 1 }).await.is_ok()
    }
}

fn is_duplicate_key_only(error: &mongodb::error::Error) -> bool {
    match error.kind.as_ref() {
        ErrorKind::BulkWrite(failure) => failure
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().all(|e| e.code == 11000)),
        ErrorKind::Write(mongodb::error::WriteFailure::WriteError(e)) => e.code == 11000,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_doc_roundtrips_through_bson() {
        let doc = AggregateDoc {
            window: 5,
            bucket_start: 1_700_000_000_000,
            count: 3,
            errors: 1,
            created_at: 1_700_000_000_000,
        };
        let bson = bson::to_document(&doc).unwrap();
        assert_eq!(bson.get_i64("bucketStart").unwrap(), 1_700_000_000_000);
        let back: AggregateDoc = bson::from_document(bson).unwrap();
        assert_eq!(back.count, 3);
    }
}
