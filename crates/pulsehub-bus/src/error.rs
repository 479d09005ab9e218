//! Event bus error types.

use std::backtrace::Backtrace;
use std::fmt;
use uuid::Uuid;

use pulsehub_core::ErrorCode;

/// Errors raised while preparing a broadcast payload. Delivery itself never
/// errors: a slow or closed subscriber is simply skipped, not reported to
/// the publisher.
#[derive(Debug)]
pub struct BusError {
    id: Uuid,
    kind: BusErrorKind,
    backtrace: Backtrace,
}

/// Specific event bus failure kinds.
#[derive(Debug)]
pub enum BusErrorKind {
    /// JSON serialization of an outgoing message failed.
    Serialization(serde_json::Error),
}

impl BusError {
    /// Create a new event bus error with automatic UUID and backtrace.
    #[must_use]
    pub fn new(kind: BusErrorKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    /// Get the unique error ID for tracing correlation.
    #[must_use]
    pub fn error_id(&self) -> Uuid {
        self.id
    }

    /// Get the specific error kind.
    #[must_use]
    pub fn kind(&self) -> &BusErrorKind {
        &self.kind
    }

    /// Get the captured backtrace.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Map to HTTP-compatible error code.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            BusErrorKind::Serialization(_) => ErrorCode::InternalError,
        }
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            BusErrorKind::Serialization(e) => write!(f, "event bus serialization error: {e}"),
        }
    }
}

impl std::error::Error for BusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            BusErrorKind::Serialization(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for BusError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(BusErrorKind::Serialization(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BusError {
        serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into()
    }

    #[test]
    fn error_has_unique_id() {
        let err1 = sample();
        let err2 = sample();
        assert_ne!(err1.error_id(), err2.error_id());
    }

    #[test]
    fn error_code_mapping() {
        assert_eq!(sample().error_code(), ErrorCode::InternalError);
    }
}
