//! Route matching logic.
//!
//! # Responsibilities
//! - Match path prefix (case-sensitive)
//! - Detect WebSocket upgrade intent
//!
//! # Design Decisions
//! - Path matching is a plain string prefix, so `/ws` also covers `/ws/lobby`
//!   and `/wsx`
//! - Header tokens are compared case-insensitively
//! - No regex to guarantee O(n) matching

use axum::http::{header, HeaderMap};

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if the path starts with this prefix.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

/// True when the headers ask for a WebSocket protocol switch.
///
/// Requires `Upgrade: websocket` and an `upgrade` token in `Connection`
/// (which may be a list such as `keep-alive, Upgrade`).
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    let upgrade = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("websocket")))
        .unwrap_or(false);

    upgrade && connection_has_token(headers, "upgrade")
}

/// True when any `Connection` header lists `token`.
pub fn connection_has_token(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|t| t.trim().eq_ignore_ascii_case(token))
}
