//! Bearer credential resolution and signed-envelope verification.
//!
//! Implements the Auth Verifier component: resolving a bearer credential
//! from an `Authorization` header or `token` query parameter, and verifying
//! it against a shared HMAC secret carrying a subject and expiry. A
//! credential that is absent, malformed, expired, or signature-invalid
//! resolves to a null identity rather than an error — only token issuance
//! (the `GET /token` dev convenience) can fail.

pub mod claims;
pub mod error;
pub mod verifier;

pub use claims::{Claims, Identity};
pub use error::{AuthError, AuthErrorKind};
pub use verifier::{AuthVerifier, DEV_TOKEN_TTL_SECS, new_connection_id};
