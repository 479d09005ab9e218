//! Request correlation and rate-limit middleware for the request endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use pulsehub_ratelimit::RateLimiter;
use tower_http::request_id::MakeRequestId;
use uuid::Uuid;

/// Generates UUID v7 request identifiers.
///
/// Implements `tower_http::request_id::MakeRequestId` to integrate with
/// `SetRequestIdLayer`. UUID v7 provides time-ordered identifiers that sort
/// chronologically, making log analysis and correlation easier.
#[derive(Clone, Copy, Debug, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(
        &mut self,
        _request: &http::Request<B>,
    ) -> Option<tower_http::request_id::RequestId> {
        let id = Uuid::now_v7();
        let header_value = http::HeaderValue::from_str(&id.to_string()).ok()?;
        Some(tower_http::request_id::RequestId::new(header_value))
    }
}

/// Per-source-IP request budget enforcement, mounted ahead of `/ingest`.
///
/// Rejects with `429` once the caller's source address exceeds its
/// rolling one-second budget; otherwise passes the request through
/// unchanged.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    if limiter.check(addr.ip()) {
        next.run(request).await
    } else {
        StatusCode::TOO_MANY_REQUESTS.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_valid_uuid_v7() {
        let mut maker = MakeRequestUuidV7;
        #[allow(clippy::expect_used)]
        let request = http::Request::builder().body(()).expect("test request");

        let id = maker.make_request_id(&request);
        assert!(id.is_some());

        #[allow(clippy::expect_used)]
        let header = id.expect("id is some").header_value().clone();
        let parsed = Uuid::parse_str(header.to_str().unwrap_or_default());
        assert!(parsed.is_ok());

        #[allow(clippy::expect_used)]
        let uuid = parsed.expect("valid uuid");
        assert_eq!(uuid.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn generates_unique_ids() {
        let mut maker = MakeRequestUuidV7;
        #[allow(clippy::expect_used)]
        let request = http::Request::builder().body(()).expect("test request");

        #[allow(clippy::expect_used)]
        let id1 = maker
            .make_request_id(&request)
            .expect("id1")
            .header_value()
            .clone();
        #[allow(clippy::expect_used)]
        let id2 = maker
            .make_request_id(&request)
            .expect("id2")
            .header_value()
            .clone();

        assert_ne!(id1, id2);
    }
}
