//! HTTP server setup and dispatch.
//!
//! # Responsibilities
//! - Create the Axum Router with the catch-all dispatch handler
//! - Wire up middleware (tracing, request ID)
//! - Send each request to a proxy route or the static asset tree
//! - Bound upstream waits; an upstream that never answers is a 504
//! - Drain WebSocket tunnels on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::assets::AssetStore;
use crate::config::ServerConfig;
use crate::http::proxy::{self, HttpClient};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::ProxyError;
use crate::http::{static_files, websocket};
use crate::net::{ConnectionPhase, ConnectionTracker};
use crate::observability::metrics;
use crate::routing::{is_websocket_upgrade, RouteError, RouteMatch, Router as RouteTable};

/// How long shutdown waits for open tunnels.
const TUNNEL_DRAIN: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<RouteTable>,
    pub client: HttpClient,
    pub assets: AssetStore,
    pub tunnels: ConnectionTracker,
    pub compress: bool,
    pub connect_timeout: Duration,
    /// Upper bound on waiting for upstream response headers.
    pub request_timeout: Duration,
}

/// HTTP server for the dev proxy.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    tunnels: ConnectionTracker,
}

impl HttpServer {
    /// Create a new HTTP server serving `assets` under `config`.
    pub fn new(config: ServerConfig, assets: AssetStore) -> Result<Self, RouteError> {
        let route_table = Arc::new(RouteTable::from_config(&config.routes)?);
        let tunnels = ConnectionTracker::new();

        let state = AppState {
            router: route_table,
            client: proxy::build_client(&config.timeouts),
            assets,
            tunnels: tunnels.clone(),
            compress: config.compress_responses(),
            connect_timeout: Duration::from_secs(config.timeouts.connect_secs),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            tunnels,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(dispatch))
            .route("/{*path}", any(dispatch))
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires, then drain tunnels.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mode = %self.config.mode,
            compress = self.config.compress_responses(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, no longer accepting connections");
            })
            .await?;

        let open = self.tunnels.active_count();
        if open > 0 {
            tracing::info!(tunnels = open, "Waiting for WebSocket tunnels to close");
            if !self.tunnels.wait_idle(TUNNEL_DRAIN).await {
                tracing::warn!(
                    tunnels = self.tunnels.active_count(),
                    "Tunnels still open after drain deadline"
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Live WebSocket tunnels.
    pub fn tunnels(&self) -> &ConnectionTracker {
        &self.tunnels
    }
}

/// Route one request to a proxy target or the asset tree.
async fn dispatch(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let request_id = request_id(request.headers()).to_string();

    tracing::trace!(
        request_id = %request_id,
        peer = %peer,
        phase = %ConnectionPhase::Idle,
        method = %method,
        path = %path,
        "Request received"
    );

    let matched = state.router.match_path(&path);
    tracing::trace!(
        request_id = %request_id,
        phase = %ConnectionPhase::Matched,
        route = %matched.label(),
        "Route selected"
    );

    match matched {
        RouteMatch::Proxy(route) => {
            let upgrade = route.websocket && is_websocket_upgrade(request.headers());
            tracing::debug!(
                request_id = %request_id,
                phase = %ConnectionPhase::Proxying,
                route = %route.prefix(),
                upstream = %route.upstream().url(),
                websocket = upgrade,
                "Proxying request"
            );

            let upstream_call = async {
                if upgrade {
                    websocket::tunnel(route, request, state.connect_timeout, state.tunnels.clone()).await
                } else {
                    proxy::forward(&state.client, route, request).await
                }
            };
            let result = tokio::time::timeout(state.request_timeout, upstream_call)
                .await
                .unwrap_or_else(|_| {
                    Err(ProxyError::UpstreamTimeout {
                        upstream: route.upstream().connect_address().to_string(),
                    })
                });

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        request_id = %request_id,
                        route = %route.prefix(),
                        status = %e.status(),
                        error = %e,
                        "Proxy request failed"
                    );
                    e.into_response()
                }
            };

            metrics::record_request(&method, response.status().as_u16(), route.prefix(), start);
            response
        }
        RouteMatch::Static => {
            let tree = state.assets.current();
            let generation = tree.generation();
            let response = static_files::serve(tree, state.compress, request).await;
            let status = response.status();

            let phase = if status == StatusCode::NOT_FOUND {
                ConnectionPhase::NotFound
            } else {
                ConnectionPhase::Serving
            };
            tracing::debug!(
                request_id = %request_id,
                phase = %phase,
                generation,
                status = %status,
                path = %path,
                "Static request"
            );

            metrics::record_request(&method, status.as_u16(), matched.label(), start);
            response
        }
    }
}
