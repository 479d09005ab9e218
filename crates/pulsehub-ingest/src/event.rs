//! Event record shapes: the permissive wire form and the validated form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The action value that marks an event as an error occurrence.
pub const ERROR_ACTION: &str = "error";

/// A client-submitted event record as it arrives over the wire.
///
/// Every field is optional at this layer; [`crate::validator::validate_batch`]
/// is responsible for rejecting records that don't satisfy the shape rules.
/// `metadata` defaults to an empty object when absent rather than being
/// merged in by a generic object-spread, per the re-architecture guidance
/// against dynamic default-merging.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
    pub ts: Option<i64>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub route: Option<String>,
    pub action: Option<String>,
    pub metadata: Option<Value>,
}

/// A shape-checked, normalized event record ready for aggregation and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "eventId")]
    pub event_id: String,
    pub ts: i64,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub route: String,
    pub action: String,
    pub metadata: Value,
}

impl Event {
    /// Whether this event's action is the special error marker.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.action == ERROR_ACTION
    }

    /// Whether this event contributes to the unique-user count.
    #[must_use]
    pub fn has_user(&self) -> bool {
        !self.user_id.is_empty()
    }
}
