//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for a request path
//! - Return matched route or the static fallback
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan in declaration order (acceptable for dev route counts)
//! - Explicit `Static` outcome rather than silent default

use std::str::FromStr;

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{HeaderValue, Uri};
use thiserror::Error;
use url::Url;

use crate::config::RouteRule;
use crate::routing::matcher::PathPrefixMatcher;

/// Error compiling a route table.
#[derive(Debug, Error)]
#[error("route {prefix:?}: invalid target {target:?}: {reason}")]
pub struct RouteError {
    pub prefix: String,
    pub target: String,
    pub reason: String,
}

/// A parsed forwarding target.
#[derive(Debug, Clone)]
pub struct Upstream {
    url: Url,
    authority: Authority,
    origin: HeaderValue,
    connect_address: String,
    base_path: String,
}

impl Upstream {
    /// Parse an `http://host[:port][/base]` target.
    pub fn parse(target: &str) -> Result<Self, String> {
        let url = Url::parse(target).map_err(|e| e.to_string())?;
        if url.scheme() != "http" {
            return Err(format!("unsupported scheme {:?}", url.scheme()));
        }
        let host = url.host_str().ok_or("missing host")?.to_string();

        let authority_str = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.clone(),
        };
        let authority = Authority::from_str(&authority_str).map_err(|e| e.to_string())?;

        let origin = HeaderValue::from_str(&url.origin().ascii_serialization())
            .map_err(|e| e.to_string())?;

        let port = url.port_or_known_default().unwrap_or(80);
        let connect_address = format!("{host}:{port}");
        let base_path = url.path().trim_end_matches('/').to_string();

        Ok(Self {
            url,
            authority,
            origin,
            connect_address,
            base_path,
        })
    }

    /// The configured target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Value sent as `Host` when origin rewriting is on.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// `scheme://host[:port]`, the value sent as `Origin` when rewriting.
    pub fn origin(&self) -> &HeaderValue {
        &self.origin
    }

    /// `host:port` suitable for `TcpStream::connect`.
    pub fn connect_address(&self) -> &str {
        &self.connect_address
    }

    /// Origin-form request target: base path prepended to the client's path.
    pub fn path_for(&self, path_and_query: Option<&PathAndQuery>) -> String {
        let pq = path_and_query.map(PathAndQuery::as_str).unwrap_or("/");
        format!("{}{}", self.base_path, pq)
    }

    /// Absolute-form URI used with the pooled HTTP client.
    pub fn uri_for(&self, path_and_query: Option<&PathAndQuery>) -> Result<Uri, axum::http::Error> {
        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(self.path_for(path_and_query))
            .build()
    }
}

/// A compiled forwarding rule.
#[derive(Debug, Clone)]
pub struct Route {
    matcher: PathPrefixMatcher,
    upstream: Upstream,
    /// Replace `Origin`/`Host` with the upstream's.
    pub rewrite_origin: bool,
    /// Tunnel WebSocket upgrades.
    pub websocket: bool,
}

impl Route {
    pub fn compile(rule: &RouteRule) -> Result<Self, RouteError> {
        let upstream = Upstream::parse(&rule.target).map_err(|reason| RouteError {
            prefix: rule.path_prefix.clone(),
            target: rule.target.clone(),
            reason,
        })?;
        Ok(Self {
            matcher: PathPrefixMatcher::new(rule.path_prefix.clone()),
            upstream,
            rewrite_origin: rule.rewrite_origin,
            websocket: rule.websocket,
        })
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }
}

/// Outcome of a route lookup.
#[derive(Debug, Clone, Copy)]
pub enum RouteMatch<'a> {
    /// Forward to an upstream.
    Proxy(&'a Route),
    /// Resolve against the asset tree.
    Static,
}

impl RouteMatch<'_> {
    /// Label used in logs and metrics: the rule prefix, or `static`.
    pub fn label(&self) -> &str {
        match self {
            RouteMatch::Proxy(route) => route.prefix(),
            RouteMatch::Static => "static",
        }
    }
}

/// Ordered, first-match-wins route table.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Compile routes from configuration, preserving declaration order.
    pub fn from_config(rules: &[RouteRule]) -> Result<Self, RouteError> {
        let routes = rules.iter().map(Route::compile).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { routes })
    }

    /// Find the first rule whose prefix matches `path`.
    pub fn match_path(&self, path: &str) -> RouteMatch<'_> {
        self.routes
            .iter()
            .find(|route| route.matcher.matches(path))
            .map(RouteMatch::Proxy)
            .unwrap_or(RouteMatch::Static)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(prefix: &str, target: &str) -> RouteRule {
        RouteRule {
            path_prefix: prefix.into(),
            target: target.into(),
            rewrite_origin: true,
            websocket: true,
        }
    }

    #[test]
    fn first_match_wins_in_declaration_order() {
        let router = Router::from_config(&[
            rule("/api/v2", "http://127.0.0.1:9002"),
            rule("/api", "http://127.0.0.1:9001"),
        ])
        .unwrap();

        match router.match_path("/api/v2/users") {
            RouteMatch::Proxy(route) => assert_eq!(route.prefix(), "/api/v2"),
            RouteMatch::Static => panic!("expected proxy match"),
        }
        match router.match_path("/api/v1") {
            RouteMatch::Proxy(route) => assert_eq!(route.prefix(), "/api"),
            RouteMatch::Static => panic!("expected proxy match"),
        }
    }

    #[test]
    fn unmatched_paths_fall_back_to_static() {
        let router = Router::from_config(&[RouteRule::default()]).unwrap();
        assert!(matches!(router.match_path("/webgame.wasm"), RouteMatch::Static));
        assert!(matches!(router.match_path("/"), RouteMatch::Static));
        assert!(matches!(router.match_path("/ws"), RouteMatch::Proxy(_)));
    }

    #[test]
    fn match_labels() {
        let router = Router::from_config(&[RouteRule::default()]).unwrap();
        assert_eq!(router.match_path("/ws/lobby").label(), "/ws");
        assert_eq!(router.match_path("/index.html").label(), "static");
    }

    #[test]
    fn upstream_origin_and_authority() {
        let upstream = Upstream::parse("http://127.0.0.1:8002").unwrap();
        assert_eq!(upstream.origin(), "http://127.0.0.1:8002");
        assert_eq!(upstream.authority().as_str(), "127.0.0.1:8002");
        assert_eq!(upstream.connect_address(), "127.0.0.1:8002");

        let default_port = Upstream::parse("http://localhost").unwrap();
        assert_eq!(default_port.origin(), "http://localhost");
        assert_eq!(default_port.authority().as_str(), "localhost");
        assert_eq!(default_port.connect_address(), "localhost:80");
    }

    #[test]
    fn upstream_uri_keeps_path_and_query() {
        let upstream = Upstream::parse("http://127.0.0.1:8002").unwrap();
        let pq = PathAndQuery::from_static("/ws?room=1");
        let uri = upstream.uri_for(Some(&pq)).unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:8002/ws?room=1");
    }

    #[test]
    fn upstream_base_path_is_prepended() {
        let upstream = Upstream::parse("http://127.0.0.1:8002/game/").unwrap();
        let pq = PathAndQuery::from_static("/ws");
        assert_eq!(upstream.path_for(Some(&pq)), "/game/ws");
        assert_eq!(upstream.path_for(None), "/game/");
    }

    #[test]
    fn rejects_non_http_targets() {
        let err = Router::from_config(&[rule("/ws", "ws://127.0.0.1:8002")]).unwrap_err();
        assert_eq!(err.prefix, "/ws");
    }
}
