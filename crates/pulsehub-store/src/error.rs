//! Persistence error types.

use std::backtrace::Backtrace;
use std::fmt;
use uuid::Uuid;

use pulsehub_core::ErrorCode;

/// A persistence failure with UUID tracking for log correlation.
///
/// Per the adapter's failure semantics, most of these are logged at
/// `debug` and swallowed by the caller rather than surfaced to a client —
/// this type exists so the swallow site still has a typed category and an
/// id to correlate against the log line, not a blanket catch.
#[derive(Debug)]
pub struct StoreError {
    id: Uuid,
    kind: StoreErrorKind,
    backtrace: Backtrace,
}

/// Specific persistence failure kinds.
#[derive(Debug)]
pub enum StoreErrorKind {
    /// The MongoDB driver reported an error (connection, write, index, or command failure).
    Database(mongodb::error::Error),
    /// BSON (de)serialization of a document failed.
    Bson(String),
}

impl StoreError {
    /// Create a new store error with automatic UUID and backtrace.
    #[must_use]
    pub fn new(kind: StoreErrorKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    /// Create a BSON error from a message.
    #[must_use]
    pub fn bson(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Bson(message.into()))
    }

    /// Get the unique error ID for tracing correlation.
    #[must_use]
    pub fn error_id(&self) -> Uuid {
        self.id
    }

    /// Get the specific error kind.
    #[must_use]
    pub fn kind(&self) -> &StoreErrorKind {
        &self.kind
    }

    /// Get the captured backtrace.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Map to HTTP-compatible error code.
    ///
    /// Used only at startup (a fatal initial connect or index-ensure
    /// failure); on the steady-state ingestion path these errors are
    /// logged and swallowed, never surfaced as a response.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            StoreErrorKind::Database(_) | StoreErrorKind::Bson(_) => ErrorCode::DatabaseError,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StoreErrorKind::Database(e) => write!(f, "store database error: {e}"),
            StoreErrorKind::Bson(msg) => write!(f, "store bson error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            StoreErrorKind::Database(e) => Some(e),
            StoreErrorKind::Bson(_) => None,
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        Self::new(StoreErrorKind::Database(e))
    }
}

impl From<bson::ser::Error> for StoreError {
    fn from(e: bson::ser::Error) -> Self {
        Self::new(StoreErrorKind::Bson(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_has_unique_id() {
        let err1 = StoreError::bson("bad document");
        let err2 = StoreError::bson("bad document");
        assert_ne!(err1.error_id(), err2.error_id());
    }

    #[test]
    fn error_code_mapping() {
        assert_eq!(StoreError::bson("x").error_code(), ErrorCode::DatabaseError);
    }

    #[test]
    fn display_formatting() {
        let err = StoreError::bson("missing field");
        assert_eq!(err.to_string(), "store bson error: missing field");
    }
}
