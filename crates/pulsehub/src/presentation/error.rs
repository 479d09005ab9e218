//! Top-level application error with HTTP response integration.

use std::backtrace::Backtrace;
use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pulsehub_core::{ErrorCode, ServiceError, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top-level error type returned from HTTP handlers.
///
/// Unifies validation failures from the ingestion pipeline and cross-cutting
/// service failures (auth, readiness) into a single type with a JSON
/// response shape: `{code, message, errorId}`.
#[derive(Debug)]
pub struct AppError {
    id: Uuid,
    kind: AppErrorKind,
    backtrace: Backtrace,
}

/// Specific application error kinds.
#[derive(Debug)]
pub enum AppErrorKind {
    /// A request body produced zero valid events after validation.
    EmptyPayload { message: &'static str },
    /// A cross-cutting service failure (auth, readiness).
    Service(ServiceError),
}

impl AppError {
    /// Create a new application error with automatic UUID and backtrace.
    #[must_use]
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    /// The request body was empty before validation ran.
    #[must_use]
    pub fn empty_payload() -> Self {
        Self::new(AppErrorKind::EmptyPayload {
            message: "empty payload",
        })
    }

    /// The request body was non-empty, but every record failed validation.
    #[must_use]
    pub fn no_valid_events() -> Self {
        Self::new(AppErrorKind::EmptyPayload {
            message: "no valid events",
        })
    }

    /// Get the unique error ID for tracing correlation.
    #[must_use]
    pub fn error_id(&self) -> Uuid {
        self.id
    }

    /// Get the specific error kind.
    #[must_use]
    pub fn kind(&self) -> &AppErrorKind {
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
            AppErrorKind::EmptyPayload { .. } => ErrorCode::ValidationFailed,
            AppErrorKind::Service(e) => e.error_code(),
        }
    }

    /// Convert to HTTP status code.
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        StatusCode::from_u16(self.error_code().http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Convert to the JSON error response body.
    #[must_use]
    pub fn to_response(&self) -> ErrorBody {
        ErrorBody {
            code: self.error_code(),
            message: self.to_string(),
            error_id: self.id,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AppErrorKind::EmptyPayload { message } => write!(f, "{message}"),
            AppErrorKind::Service(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            AppErrorKind::EmptyPayload { .. } => None,
            AppErrorKind::Service(e) => Some(e),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        Self::new(AppErrorKind::Service(e))
    }
}

impl From<ValidationError> for AppError {
    fn from(_: ValidationError) -> Self {
        Self::no_valid_events()
    }
}

/// JSON error response body: `{code, message, errorId}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    pub error_id: Uuid,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        (status, Json(self.to_response())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_has_unique_id() {
        let e1 = AppError::empty_payload();
        let e2 = AppError::empty_payload();
        assert_ne!(e1.error_id(), e2.error_id());
    }

    #[test]
    fn empty_payload_maps_to_400() {
        let err = AppError::empty_payload();
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "empty payload");
    }

    #[test]
    fn no_valid_events_message() {
        let err = AppError::no_valid_events();
        assert_eq!(err.to_string(), "no valid events");
    }

    #[test]
    fn unauthorized_service_error_maps_to_401() {
        let err: AppError = ServiceError::unauthorized("missing credential").into();
        assert_eq!(err.http_status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn unavailable_service_error_maps_to_503() {
        let err: AppError = ServiceError::unavailable("mongo unreachable").into();
        assert_eq!(err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn error_body_serializes_camel_case() {
        let err = AppError::empty_payload();
        let json = serde_json::to_string(&err.to_response()).expect("serialize");
        assert!(json.contains("\"code\":\"VALIDATION_FAILED\""));
        assert!(json.contains("\"errorId\""));
    }
}
