//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) and echo it on the response
//! - Prepare headers for forwarding to an upstream
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Client-supplied request IDs are kept
//! - Origin rewriting touches exactly `Origin` and `Host`

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::http::response::strip_hop_by_hop;
use crate::routing::Route;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer assigning a UUID request ID when the client sent none.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer copying the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Request ID for logging, `"unknown"` if missing.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Rewrite client headers for the upstream leg of `route`.
///
/// Strips hop-by-hop headers (keeping `Upgrade` for handshakes) and, when the
/// route rewrites origins, replaces `Origin` and `Host` with the upstream's so
/// its same-origin checks pass.
pub fn prepare_upstream_headers(headers: &mut HeaderMap, route: &Route, handshake: bool) {
    strip_hop_by_hop(headers, handshake);

    if route.rewrite_origin {
        let upstream = route.upstream();
        if headers.contains_key(header::ORIGIN) {
            headers.insert(header::ORIGIN, upstream.origin().clone());
        }
        if let Ok(host) = HeaderValue::from_str(upstream.authority().as_str()) {
            headers.insert(header::HOST, host);
        }
    }

    if handshake {
        headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
    }
}
