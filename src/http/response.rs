//! Response handling and transformation.
//!
//! # Responsibilities
//! - Map proxy failures to gateway status codes
//! - Strip hop-by-hop headers from relayed responses
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Refused/unreachable upstream → 502, connect or response timeout → 504
//! - Error bodies are short plain text; details go to the log

use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::resilience::timeouts::ConnectError;

/// Per-request proxy failure.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("upstream {upstream} unavailable: {reason}")]
    UpstreamUnavailable { upstream: String, reason: String },

    #[error("upstream {upstream} timed out")]
    UpstreamTimeout { upstream: String },

    #[error("upstream handshake failed: {0}")]
    Handshake(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Handshake(_) => StatusCode::BAD_GATEWAY,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<ConnectError> for ProxyError {
    fn from(err: ConnectError) -> Self {
        match err {
            ConnectError::TimedOut { addr, .. } => ProxyError::UpstreamTimeout { upstream: addr },
            ConnectError::Io { addr, source } => ProxyError::UpstreamUnavailable {
                upstream: addr,
                reason: source.to_string(),
            },
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ProxyError::UpstreamUnavailable { .. } | ProxyError::Handshake(_) => {
                "Upstream request failed"
            }
            ProxyError::UpstreamTimeout { .. } => "Upstream timed out",
            ProxyError::InvalidRequest(_) => "Invalid request",
        };
        (status, body).into_response()
    }
}

/// Headers that describe a single transport hop and must not be forwarded.
pub const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

/// Remove hop-by-hop headers, including any named by `Connection`.
///
/// `Upgrade` is removed too unless `keep_upgrade` is set (the handshake
/// path needs it on both legs).
pub fn strip_hop_by_hop(headers: &mut HeaderMap, keep_upgrade: bool) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|t| HeaderName::from_bytes(t.trim().as_bytes()).ok())
        .filter(|name| !(keep_upgrade && *name == header::UPGRADE))
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    if !keep_upgrade {
        headers.remove(header::UPGRADE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::io;
    use std::time::Duration;

    #[test]
    fn connect_errors_map_to_gateway_statuses() {
        let refused: ProxyError = ConnectError::Io {
            addr: "127.0.0.1:1".into(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        }
        .into();
        assert_eq!(refused.status(), StatusCode::BAD_GATEWAY);

        let slow: ProxyError = ConnectError::TimedOut {
            addr: "127.0.0.1:1".into(),
            timeout: Duration::from_secs(1),
        }
        .into();
        assert_eq!(slow.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(slow.into_response().status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn strips_hop_by_hop_and_connection_listed_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-session"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session", HeaderValue::from_static("abc"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(header::ORIGIN, HeaderValue::from_static("http://localhost:8001"));

        strip_hop_by_hop(&mut headers, false);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::ORIGIN));
    }

    #[test]
    fn keeps_upgrade_for_handshakes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));

        strip_hop_by_hop(&mut headers, true);

        assert!(headers.contains_key(header::UPGRADE));
        assert!(!headers.contains_key(header::CONNECTION));
    }
}
