//! Plain HTTP forwarding to an upstream.
//!
//! # Responsibilities
//! - Rewrite the request URI to the upstream (base path + client path)
//! - Stream request and response bodies through unchanged
//! - Classify client errors into gateway failures
//!
//! # Design Decisions
//! - Pooled hyper-util client, HTTP/1.1 to the upstream
//! - Connect timeout enforced by the connector
//! - No retries; a failed forward is reported once

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Version};
use axum::response::Response;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::http::request::prepare_upstream_headers;
use crate::http::response::{strip_hop_by_hop, ProxyError};
use crate::resilience::timeouts::is_timeout;
use crate::routing::Route;

/// Shared upstream client.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build the pooled upstream client.
pub fn build_client(timeouts: &TimeoutConfig) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
    connector.set_nodelay(true);
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Forward a non-upgrade request to the route's upstream.
pub async fn forward(
    client: &HttpClient,
    route: &Route,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let (mut parts, body) = request.into_parts();

    prepare_upstream_headers(&mut parts.headers, route, false);
    parts.uri = route
        .upstream()
        .uri_for(parts.uri.path_and_query())
        .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;
    parts.version = Version::HTTP_11;

    let response = client
        .request(Request::from_parts(parts, body))
        .await
        .map_err(|e| classify(route, e))?;

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers, false);
    Ok(Response::from_parts(parts, Body::new(body)))
}

fn classify(route: &Route, err: hyper_util::client::legacy::Error) -> ProxyError {
    let upstream = route.upstream().connect_address().to_string();
    if is_timeout(&err) {
        ProxyError::UpstreamTimeout { upstream }
    } else {
        let kind = if err.is_connect() { "connect" } else { "request" };
        ProxyError::UpstreamUnavailable {
            upstream,
            reason: format!("{kind}: {err}"),
        }
    }
}
