//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, Request},
    response::Response,
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use webgame_devserver::build::{BuildError, CompileJob, Compiler};
use webgame_devserver::config::{RouteRule, ServerConfig};
use webgame_devserver::net::ConnectionTracker;
use webgame_devserver::{AssetStore, HttpServer, Shutdown};

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// HTTP backend that answers every request with a JSON description of it.
pub struct EchoBackend {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
}

pub async fn start_echo_backend() -> EchoBackend {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new().fallback(echo).with_state(hits.clone());
    let addr = serve(app).await;
    EchoBackend { addr, hits }
}

async fn echo(State(hits): State<Arc<AtomicUsize>>, request: Request<Body>) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    let mut headers = Map::new();
    for (name, value) in &parts.headers {
        headers.insert(
            name.to_string(),
            Value::String(value.to_str().unwrap_or_default().to_string()),
        );
    }

    Json(json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

/// WebSocket backend that echoes frames and records handshake origins.
///
/// A text frame `"bye"` makes the backend close the connection itself.
pub struct WsBackend {
    pub addr: SocketAddr,
    pub origins: Arc<Mutex<Vec<Option<String>>>>,
    pub closed: mpsc::UnboundedReceiver<()>,
}

#[derive(Clone)]
struct WsState {
    origins: Arc<Mutex<Vec<Option<String>>>>,
    closed: mpsc::UnboundedSender<()>,
}

pub async fn start_ws_backend() -> WsBackend {
    let origins = Arc::new(Mutex::new(Vec::new()));
    let (closed_tx, closed) = mpsc::unbounded_channel();
    let state = WsState {
        origins: origins.clone(),
        closed: closed_tx,
    };
    let app = Router::new()
        .route("/{*path}", get(ws_handler))
        .with_state(state);
    let addr = serve(app).await;
    WsBackend { addr, origins, closed }
}

async fn ws_handler(
    State(state): State<WsState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let origin = headers
        .get("origin")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.origins.lock().unwrap().push(origin);
    ws.on_upgrade(move |socket| echo_socket(socket, state.closed))
}

async fn echo_socket(mut socket: WebSocket, closed: mpsc::UnboundedSender<()>) {
    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Text(ref text) if text.as_str() == "bye" => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            Message::Text(_) | Message::Binary(_) => {
                if socket.send(message).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    let _ = closed.send(());
}

/// Backend that only ever answers with a plain 200, never upgrading.
pub async fn start_plain_backend() -> SocketAddr {
    serve(Router::new().route("/{*path}", any(|| async { "no websockets here" }))).await
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Backend that accepts connections and never writes a byte.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address nothing is listening on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

// ---------------------------------------------------------------------------
// Proxy
// ---------------------------------------------------------------------------

/// A running dev server.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub tunnels: ConnectionTracker,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }
}

/// Config for a local proxy: `/ws` → `backend`, no building.
pub fn proxy_config(backend: SocketAddr, static_root: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.static_root = static_root.to_path_buf();
    config.build.enabled = false;
    config.timeouts.connect_secs = 2;
    config.routes = vec![RouteRule {
        target: format!("http://{backend}"),
        ..RouteRule::default()
    }];
    config
}

pub async fn start_proxy(config: ServerConfig, assets: AssetStore) -> TestProxy {
    let listener = webgame_devserver::net::bind(&config).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config, assets).unwrap();
    let tunnels = server.tunnels().clone();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestProxy {
        addr,
        shutdown,
        tunnels,
        handle,
    }
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// Write `files` under `<tmp>/<dir>` and return that directory.
pub fn write_tree(tmp: &Path, dir: &str, files: &[(&str, &[u8])]) -> PathBuf {
    let root = tmp.join(dir);
    fs::create_dir_all(&root).unwrap();
    for (name, content) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    root
}

/// Compiler stand-in whose output and failure can be changed between builds.
pub struct FakeCompiler {
    pub wasm: Mutex<Vec<u8>>,
    pub fail: AtomicBool,
}

impl FakeCompiler {
    pub fn new(wasm: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            wasm: Mutex::new(wasm.to_vec()),
            fail: AtomicBool::new(false),
        })
    }

    pub fn set_wasm(&self, wasm: &[u8]) {
        *self.wasm.lock().unwrap() = wasm.to_vec();
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl Compiler for FakeCompiler {
    fn compile(&self, job: &CompileJob<'_>) -> Result<(), BuildError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BuildError::CompilerFailed {
                program: "fake-compiler".into(),
                status: "exit code 101".into(),
                stderr: "error: could not compile `webgame`".into(),
            });
        }
        let wasm = self.wasm.lock().unwrap().clone();
        fs::write(job.out_dir.join(format!("{}.js", job.out_name)), "let wasm_bindgen;").unwrap();
        fs::write(job.out_dir.join(format!("{}.wasm", job.out_name)), wasm).unwrap();
        Ok(())
    }
}
