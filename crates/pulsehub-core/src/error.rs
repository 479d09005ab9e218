//! Core error types with UUID tracking for distributed tracing.
//!
//! These are pure errors with no infrastructure dependencies. Every error
//! includes a unique identifier for correlation across logs and traces.
//!
//! # Error types
//!
//! - [`ValidationError`]: Field-level validation failures (e.g., empty field, invalid format)
//! - [`ServiceError`]: Cross-cutting service failures (auth, readiness, not-found, internal)
//!
//! # Design principles
//!
//! - **Pure types**: No side effects, no infrastructure dependencies
//! - **UUID tracking**: Every error instance gets a unique ID for tracing
//! - **Backtrace capture**: Backtraces are captured at error creation for debugging
//! - **Informative messages**: Display implementations provide user-friendly messages

use crate::error_code::ErrorCode;
use std::backtrace::Backtrace;
use std::fmt;
use uuid::Uuid;

/// Field-level validation errors with UUID tracking.
///
/// Use this type when validating user input at a domain boundary. Each variant
/// captures specific validation failure details that enable informative error messages.
#[derive(Debug)]
pub struct ValidationError {
    id: Uuid,
    kind: ValidationErrorKind,
    backtrace: Backtrace,
}

/// Specific validation failure kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Required field is empty or whitespace-only.
    EmptyField { field: String },
    /// Field value doesn't match expected format.
    InvalidFormat { field: String, expected: String },
    /// Numeric value outside allowed range.
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        actual: i64,
    },
    /// String exceeds maximum length.
    TooLong {
        field: String,
        max_length: usize,
        actual_length: usize,
    },
    /// String shorter than minimum length.
    TooShort {
        field: String,
        min_length: usize,
        actual_length: usize,
    },
}

impl ValidationError {
    /// Create a new validation error with automatic UUID and backtrace.
    #[must_use]
    pub fn new(kind: ValidationErrorKind) -> Self {
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

    /// Get the specific validation failure kind.
    #[must_use]
    pub fn kind(&self) -> &ValidationErrorKind {
        &self.kind
    }

    /// Get the captured backtrace.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Map to HTTP-compatible error code. Validation failures are always client errors.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        ErrorCode::ValidationFailed
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValidationErrorKind::EmptyField { field } => write!(f, "{field} cannot be empty"),
            ValidationErrorKind::InvalidFormat { field, expected } => {
                write!(f, "{field} has invalid format, expected: {expected}")
            }
            ValidationErrorKind::OutOfRange {
                field,
                min,
                max,
                actual,
            } => write!(f, "{field} must be between {min} and {max}, got {actual}"),
            ValidationErrorKind::TooLong {
                field,
                max_length,
                actual_length,
            } => write!(
                f,
                "{field} exceeds maximum length {max_length} (got {actual_length})"
            ),
            ValidationErrorKind::TooShort {
                field,
                min_length,
                actual_length,
            } => write!(
                f,
                "{field} is shorter than minimum length {min_length} (got {actual_length})"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Cross-cutting service errors with UUID tracking.
///
/// Use this type for failures that don't fit field-level validation: missing or
/// invalid credentials, a resource that can't be located, a dependency that
/// isn't ready, or an unexpected internal failure. Infrastructure crates convert
/// their own error types into this one at the boundary where they stop being
/// infrastructure-specific and start being "something the caller must react to".
#[derive(Debug)]
pub struct ServiceError {
    id: Uuid,
    kind: ServiceErrorKind,
    backtrace: Backtrace,
}

/// Specific service error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// No credential was presented, or the credential is malformed/expired/signature-invalid.
    Unauthorized { reason: String },
    /// The named resource does not exist.
    NotFound { resource: String },
    /// A required dependency is temporarily unavailable (e.g. failed a readiness probe).
    Unavailable { detail: String },
    /// An unexpected internal failure with no more specific classification.
    Internal { detail: String },
}

impl ServiceError {
    /// Create a new service error with automatic UUID and backtrace.
    #[must_use]
    pub fn new(kind: ServiceErrorKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    /// Construct an [`ServiceErrorKind::Unauthorized`] error.
    #[must_use]
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Unauthorized {
            reason: reason.into(),
        })
    }

    /// Construct an [`ServiceErrorKind::Unavailable`] error.
    #[must_use]
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Unavailable {
            detail: detail.into(),
        })
    }

    /// Get the unique error ID for tracing correlation.
    #[must_use]
    pub fn error_id(&self) -> Uuid {
        self.id
    }

    /// Get the specific error kind.
    #[must_use]
    pub fn kind(&self) -> &ServiceErrorKind {
        &self.kind
    }

    /// Get the captured backtrace.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Map service error kind to HTTP-compatible error code.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            ServiceErrorKind::Unauthorized { .. } => ErrorCode::Unauthorized,
            ServiceErrorKind::NotFound { .. } => ErrorCode::NotFound,
            ServiceErrorKind::Unavailable { .. } => ErrorCode::ServiceUnavailable,
            ServiceErrorKind::Internal { .. } => ErrorCode::InternalError,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ServiceErrorKind::Unauthorized { reason } => write!(f, "unauthorized: {reason}"),
            ServiceErrorKind::NotFound { resource } => write!(f, "{resource} not found"),
            ServiceErrorKind::Unavailable { detail } => write!(f, "unavailable: {detail}"),
            ServiceErrorKind::Internal { detail } => write!(f, "internal error: {detail}"),
        }
    }
}

impl std::error::Error for ServiceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_has_unique_id() {
        let err1 = ValidationError::new(ValidationErrorKind::EmptyField {
            field: "title".to_string(),
        });
        let err2 = ValidationError::new(ValidationErrorKind::EmptyField {
            field: "title".to_string(),
        });
        assert_ne!(err1.error_id(), err2.error_id());
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError::new(ValidationErrorKind::TooLong {
            field: "description".to_string(),
            max_length: 100,
            actual_length: 150,
        });
        assert_eq!(
            err.to_string(),
            "description exceeds maximum length 100 (got 150)"
        );
    }

    #[test]
    fn validation_error_code_is_always_validation_failed() {
        let err = ValidationError::new(ValidationErrorKind::EmptyField {
            field: "sessionId".to_string(),
        });
        assert_eq!(err.error_code(), ErrorCode::ValidationFailed);
    }

    #[test]
    fn service_error_has_unique_id() {
        let err1 = ServiceError::unauthorized("missing credential");
        let err2 = ServiceError::unauthorized("missing credential");
        assert_ne!(err1.error_id(), err2.error_id());
    }

    #[test]
    fn service_error_code_mapping() {
        assert_eq!(
            ServiceError::unauthorized("expired").error_code(),
            ErrorCode::Unauthorized
        );
        assert_eq!(
            ServiceError::unavailable("mongo unreachable").error_code(),
            ErrorCode::ServiceUnavailable
        );
        assert_eq!(
            ServiceError::new(ServiceErrorKind::NotFound {
                resource: "bucket".to_string()
            })
            .error_code(),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn service_error_display() {
        let err = ServiceError::unavailable("connection refused");
        assert_eq!(err.to_string(), "unavailable: connection refused");
    }
}
