//! Shape-checking and normalization of raw event records.
//!
//! Records that fail a rule are dropped silently: this is per-record
//! filtering, not batch rejection. The caller decides what an empty
//! resulting batch means for its own transport.

use serde_json::{Map, Value};

use crate::event::{Event, RawEvent};
use pulsehub_core::error::{ValidationError, ValidationErrorKind};

/// Validate and normalize a batch of raw records, dropping any that fail a
/// shape rule. The returned list preserves the input order of the survivors.
#[must_use]
pub fn validate_batch(raw: Vec<RawEvent>) -> Vec<Event> {
    raw.into_iter().filter_map(|r| validate_one(r).ok()).collect()
}

fn validate_one(raw: RawEvent) -> Result<Event, ValidationError> {
    let event_id = non_empty(raw.event_id, "eventId")?;
    let ts = raw.ts.ok_or_else(|| {
        ValidationError::new(ValidationErrorKind::EmptyField {
            field: "ts".to_string(),
        })
    })?;
    if ts < 0 {
        return Err(ValidationError::new(ValidationErrorKind::OutOfRange {
            field: "ts".to_string(),
            min: 0,
            max: i64::MAX,
            actual: ts,
        }));
    }
    let session_id = non_empty(raw.session_id, "sessionId")?;
    let route = non_empty(raw.route, "route")?;
    let action = non_empty(raw.action, "action")?;
    let user_id = raw.user_id.unwrap_or_default();
    let metadata = raw.metadata.unwrap_or_else(|| Value::Object(Map::new()));

    Ok(Event {
        event_id,
        ts,
        user_id,
        session_id,
        route,
        action,
        metadata,
    })
}

fn non_empty(value: Option<String>, field: &str) -> Result<String, ValidationError> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ValidationError::new(ValidationErrorKind::EmptyField {
            field: field.to_string(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well_formed() -> RawEvent {
        RawEvent {
            event_id: Some("A".to_string()),
            ts: Some(1000),
            user_id: Some("u1".to_string()),
            session_id: Some("s1".to_string()),
            route: Some("/".to_string()),
            action: Some("view".to_string()),
            metadata: None,
        }
    }

    #[test]
    fn accepts_well_formed_record() {
        let events = validate_batch(vec![well_formed()]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, "A");
        assert_eq!(events[0].metadata, Value::Object(Map::new()));
    }

    #[test]
    fn drops_missing_session_id() {
        let mut raw = well_formed();
        raw.session_id = None;
        let events = validate_batch(vec![raw]);
        assert!(events.is_empty());
    }

    #[test]
    fn drops_negative_ts() {
        let mut raw = well_formed();
        raw.ts = Some(-1);
        let events = validate_batch(vec![raw]);
        assert!(events.is_empty());
    }

    #[test]
    fn allows_empty_user_id() {
        let mut raw = well_formed();
        raw.user_id = None;
        let events = validate_batch(vec![raw]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id, "");
    }

    #[test]
    fn filters_per_record_not_whole_batch() {
        let mut bad = well_formed();
        bad.session_id = None;
        let events = validate_batch(vec![well_formed(), bad]);
        assert_eq!(events.len(), 1);
    }
}
