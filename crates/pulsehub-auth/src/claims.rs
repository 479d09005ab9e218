//! Signed-envelope claims carried by a bearer credential.

use serde::{Deserialize, Serialize};

/// The claims embedded in a signed credential.
///
/// `sub` is the subject (a producer or dashboard-session identifier); `exp`
/// and `iat` are Unix timestamps in seconds, matching `jsonwebtoken`'s
/// expectations for its built-in expiry validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// A verified identity: the outcome of a successful credential verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
        }
    }
}
