//! Bearer credential resolution and signed-envelope verification.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::claims::{Claims, Identity};
use crate::error::AuthError;

/// Default expiry granted to `GET /token`-issued credentials: 12 hours.
pub const DEV_TOKEN_TTL_SECS: i64 = 12 * 60 * 60;

/// Resolves and verifies bearer credentials against a shared HMAC secret.
///
/// Verification is signature- and expiry-checked but never propagates an
/// error: an absent, malformed, expired, or signature-invalid credential
/// simply resolves to `None` (a null identity), per the spec's auth
/// contract. Only issuance (`GET /token`) can fail.
pub struct AuthVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthVerifier {
    /// Build a verifier from the shared signing secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a signed credential for `subject`, valid for `ttl_secs` seconds
    /// starting from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if signing fails.
    pub fn issue_token(
        &self,
        subject: &str,
        now: chrono::DateTime<Utc>,
        ttl_secs: i64,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::issuance(e.to_string()))
    }

    /// Issue a `GET /token` dev-convenience credential with the default
    /// 12-hour expiry, using the current wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if signing fails.
    pub fn issue_dev_token(&self, subject: &str) -> Result<String, AuthError> {
        self.issue_token(subject, Utc::now(), DEV_TOKEN_TTL_SECS)
    }

    /// Resolve the bearer credential string from the request's `Authorization`
    /// header and/or `token` query parameter, in the order defined by the
    /// spec: `Bearer <t>` header, then a bare `Authorization` header value,
    /// then `?token=`.
    #[must_use]
    pub fn resolve_credential<'a>(
        authorization_header: Option<&'a str>,
        token_query_param: Option<&'a str>,
    ) -> Option<&'a str> {
        if let Some(header) = authorization_header {
            if let Some(bearer) = header.strip_prefix("Bearer ") {
                let bearer = bearer.trim();
                if !bearer.is_empty() {
                    return Some(bearer);
                }
            } else if !header.trim().is_empty() {
                return Some(header.trim());
            }
        }
        token_query_param
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Verify a resolved credential string against the current wall clock.
    ///
    /// Returns `None` (a null identity) for any absent, malformed, expired,
    /// or signature-invalid credential.
    #[must_use]
    pub fn verify(&self, credential: &str) -> Option<Identity> {
        self.verify_at(credential, Utc::now().timestamp())
    }

    /// Verify a resolved credential string against an explicit `now` (Unix
    /// seconds), so expiry behavior can be tested deterministically without
    /// sleeping on the wall clock.
    #[must_use]
    pub fn verify_at(&self, credential: &str, now_unix_secs: i64) -> Option<Identity> {
        // Signature validity is checked by `decode`; expiry is checked
        // explicitly below against the caller-supplied clock rather than
        // jsonwebtoken's internal `SystemTime::now()`, so tests can assert
        // exact boundary behavior.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(credential, &self.decoding_key, &validation).ok()?;
        if data.claims.exp <= now_unix_secs {
            return None;
        }
        Some(data.claims.into())
    }
}

/// A connection-local identifier, minted once per streaming session or
/// request for log correlation. Not part of the auth contract itself.
#[must_use]
pub fn new_connection_id() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_bearer_prefixed_header() {
        let resolved = AuthVerifier::resolve_credential(Some("Bearer abc123"), None);
        assert_eq!(resolved, Some("abc123"));
    }

    #[test]
    fn resolves_bare_authorization_header() {
        let resolved = AuthVerifier::resolve_credential(Some("abc123"), None);
        assert_eq!(resolved, Some("abc123"));
    }

    #[test]
    fn resolves_query_param_when_header_absent() {
        let resolved = AuthVerifier::resolve_credential(None, Some("abc123"));
        assert_eq!(resolved, Some("abc123"));
    }

    #[test]
    fn header_takes_precedence_over_query_param() {
        let resolved = AuthVerifier::resolve_credential(Some("Bearer from-header"), Some("from-query"));
        assert_eq!(resolved, Some("from-header"));
    }

    #[test]
    fn empty_header_and_query_resolve_to_none() {
        assert_eq!(AuthVerifier::resolve_credential(Some(""), Some("")), None);
        assert_eq!(AuthVerifier::resolve_credential(None, None), None);
    }

    #[test]
    fn issued_token_verifies_with_subject() {
        let verifier = AuthVerifier::new("test-secret");
        let now = Utc::now();
        let token = verifier.issue_token("dashboard-1", now, 3600).unwrap();
        let identity = verifier.verify_at(&token, now.timestamp() + 10).unwrap();
        assert_eq!(identity.subject, "dashboard-1");
    }

    #[test]
    fn expired_token_yields_null_identity() {
        let verifier = AuthVerifier::new("test-secret");
        let now = Utc::now();
        let token = verifier.issue_token("dashboard-1", now, 60).unwrap();
        let identity = verifier.verify_at(&token, now.timestamp() + 61);
        assert!(identity.is_none());
    }

    #[test]
    fn wrong_secret_yields_null_identity() {
        let issuer = AuthVerifier::new("secret-a");
        let verifier = AuthVerifier::new("secret-b");
        let now = Utc::now();
        let token = issuer.issue_token("dashboard-1", now, 3600).unwrap();
        assert!(verifier.verify_at(&token, now.timestamp()).is_none());
    }

    #[test]
    fn malformed_credential_yields_null_identity() {
        let verifier = AuthVerifier::new("test-secret");
        assert!(verifier.verify_at("not-a-jwt", Utc::now().timestamp()).is_none());
    }
}
