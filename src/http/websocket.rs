//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Forward the upgrade handshake to the upstream over a fresh connection
//! - Relay the upstream's handshake answer to the client
//! - Splice the two upgraded streams byte-for-byte
//!
//! # Data Flow
//! ```text
//! Client ←──── raw bytes ────→ Proxy ←──── raw bytes ────→ Upstream
//! ```
//!
//! # Design Decisions
//! - No frame parsing; the proxy never sees messages, only bytes
//! - The tunnel ends when either direction reaches EOF or fails; both write
//!   halves are shut down and both sockets dropped
//! - A non-101 upstream answer is relayed as an ordinary response

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode, Version};
use axum::response::Response;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

use crate::http::request::prepare_upstream_headers;
use crate::http::response::{strip_hop_by_hop, ProxyError};
use crate::net::connection::ConnectionTracker;
use crate::observability::metrics;
use crate::resilience::timeouts;
use crate::routing::Route;

/// Which peer ended a tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Upstream,
}

/// How a tunnel ended.
#[derive(Debug)]
pub struct SpliceOutcome {
    /// Peer whose read side finished first.
    pub closed_by: Side,
    /// Bytes read from that peer, including before an error.
    pub bytes: u64,
    /// Set when the direction ended with an I/O error rather than EOF.
    pub error: Option<io::Error>,
}

/// Tunnel a WebSocket upgrade request to the route's upstream.
///
/// Returns the response for the client. On a `101` the splice runs in a
/// spawned task that outlives this call.
pub async fn tunnel(
    route: &Route,
    mut request: Request<Body>,
    connect_timeout: Duration,
    tracker: ConnectionTracker,
) -> Result<Response, ProxyError> {
    if request.extensions().get::<OnUpgrade>().is_none() {
        return Err(ProxyError::InvalidRequest(
            "connection cannot be upgraded".to_string(),
        ));
    }
    let client_upgrade = hyper::upgrade::on(&mut request);

    let upstream = route.upstream();
    let (mut parts, _body) = request.into_parts();
    prepare_upstream_headers(&mut parts.headers, route, true);
    if !parts.headers.contains_key(header::HOST) {
        if let Ok(host) = HeaderValue::from_str(upstream.authority().as_str()) {
            parts.headers.insert(header::HOST, host);
        }
    }

    let mut upstream_request = Request::builder()
        .method(parts.method)
        .uri(upstream.path_for(parts.uri.path_and_query()))
        .version(Version::HTTP_11)
        .body(Body::empty())
        .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;
    *upstream_request.headers_mut() = parts.headers;

    let stream = timeouts::connect(upstream.connect_address(), connect_timeout).await?;
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| ProxyError::Handshake(e.to_string()))?;
    tokio::spawn(async move {
        if let Err(e) = connection.with_upgrades().await {
            tracing::debug!(error = %e, "Upstream handshake connection ended with error");
        }
    });

    let mut upstream_response = sender
        .send_request(upstream_request)
        .await
        .map_err(|e| ProxyError::Handshake(e.to_string()))?;

    if upstream_response.status() != StatusCode::SWITCHING_PROTOCOLS {
        tracing::info!(
            upstream = %upstream.connect_address(),
            status = %upstream_response.status(),
            "Upstream declined WebSocket upgrade"
        );
        let (mut parts, body) = upstream_response.into_parts();
        strip_hop_by_hop(&mut parts.headers, false);
        return Ok(Response::from_parts(parts, Body::new(body)));
    }

    let upstream_upgrade = hyper::upgrade::on(&mut upstream_response);
    let (mut parts, _body) = upstream_response.into_parts();
    strip_hop_by_hop(&mut parts.headers, true);
    parts
        .headers
        .insert(header::CONNECTION, HeaderValue::from_static("upgrade"));

    let guard = tracker.track();
    let upstream_addr = upstream.connect_address().to_string();
    tokio::spawn(async move {
        let (client_io, upstream_io) = match tokio::try_join!(client_upgrade, upstream_upgrade) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(connection_id = %guard.id(), error = %e, "WebSocket upgrade failed");
                return;
            }
        };

        metrics::tunnel_opened();
        tracing::debug!(connection_id = %guard.id(), upstream = %upstream_addr, "Tunnel established");

        let outcome = splice(TokioIo::new(client_io), TokioIo::new(upstream_io)).await;

        metrics::tunnel_closed();
        match outcome.error {
            Some(e) => tracing::debug!(
                connection_id = %guard.id(),
                closed_by = ?outcome.closed_by,
                bytes = outcome.bytes,
                error = %e,
                "Tunnel closed with error"
            ),
            None => tracing::debug!(
                connection_id = %guard.id(),
                closed_by = ?outcome.closed_by,
                bytes = outcome.bytes,
                "Tunnel closed"
            ),
        }
    });

    Ok(Response::from_parts(parts, Body::empty()))
}

/// Copy bytes both ways until one side finishes, then close both.
pub async fn splice<C, U>(client: C, upstream: U) -> SpliceOutcome
where
    C: AsyncRead + AsyncWrite,
    U: AsyncRead + AsyncWrite,
{
    let (client_read, mut client_write) = tokio::io::split(client);
    let (upstream_read, mut upstream_write) = tokio::io::split(upstream);
    let mut client_read = Counted::new(client_read);
    let mut upstream_read = Counted::new(upstream_read);

    let (closed_by, result) = tokio::select! {
        r = tokio::io::copy(&mut client_read, &mut upstream_write) => (Side::Client, r),
        r = tokio::io::copy(&mut upstream_read, &mut client_write) => (Side::Upstream, r),
    };

    let _ = upstream_write.shutdown().await;
    let _ = client_write.shutdown().await;

    let bytes = match closed_by {
        Side::Client => client_read.bytes,
        Side::Upstream => upstream_read.bytes,
    };
    SpliceOutcome {
        closed_by,
        bytes,
        error: result.err(),
    }
}

/// Reader that counts what passes through it.
struct Counted<R> {
    inner: R,
    bytes: u64,
}

impl<R> Counted<R> {
    fn new(inner: R) -> Self {
        Self { inner, bytes: 0 }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for Counted<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = poll {
            self.bytes += (buf.filled().len() - before) as u64;
        }
        poll
    }
}
