//! Auth verifier error types.
//!
//! Crate-specific errors for credential issuance. Verification itself never
//! errors: a credential that is absent, malformed, expired, or
//! signature-invalid simply resolves to a null identity (see
//! [`crate::verifier::AuthVerifier::verify`]).

use std::backtrace::Backtrace;
use std::fmt;
use uuid::Uuid;

use pulsehub_core::ErrorCode;

/// Auth errors with UUID tracking. Only issuance can fail; verification
/// degrades to "no identity" rather than raising an error.
#[derive(Debug)]
pub struct AuthError {
    id: Uuid,
    kind: AuthErrorKind,
    backtrace: Backtrace,
}

/// Specific auth failure kinds.
#[derive(Debug)]
pub enum AuthErrorKind {
    /// Token issuance failed (signing error).
    Issuance(String),
}

impl AuthError {
    /// Create a new auth error with automatic UUID and backtrace.
    #[must_use]
    pub fn new(kind: AuthErrorKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    /// Construct an issuance failure from a signing error's message.
    #[must_use]
    pub fn issuance(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Issuance(message.into()))
    }

    /// Get the unique error ID for tracing correlation.
    #[must_use]
    pub fn error_id(&self) -> Uuid {
        self.id
    }

    /// Get the specific error kind.
    #[must_use]
    pub fn kind(&self) -> &AuthErrorKind {
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
            AuthErrorKind::Issuance(_) => ErrorCode::InternalError,
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AuthErrorKind::Issuance(msg) => write!(f, "token issuance failed: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_has_unique_id() {
        let e1 = AuthError::issuance("signing key rejected");
        let e2 = AuthError::issuance("signing key rejected");
        assert_ne!(e1.error_id(), e2.error_id());
    }

    #[test]
    fn error_code_is_internal() {
        assert_eq!(
            AuthError::issuance("boom").error_code(),
            ErrorCode::InternalError
        );
    }
}
