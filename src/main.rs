//! webgame-devserver
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │               DEV SERVER                      │
//!   Browser               │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!   ──────────────────────┼─▶│   net   │──▶│   http   │──▶│  routing  │  │
//!                         │  │listener │   │ dispatch │   │ first-match│  │
//!                         │  └─────────┘   └──────────┘   └─────┬─────┘  │
//!                         │                        /ws ─────────┤        │
//!                         │                ┌───────────────┐    │  else  │
//!   Game backend ◀────────┼────────────────│ proxy / tunnel│◀───┘   │    │
//!   127.0.0.1:8002        │                └───────────────┘        ▼    │
//!                         │  ┌──────────┐   ┌──────────┐   ┌───────────┐ │
//!   sources ──────────────┼─▶│ watcher  │──▶│ pipeline │──▶│AssetStore │ │
//!                         │  └──────────┘   └──────────┘   │ (ArcSwap) │ │
//!                         │                                └───────────┘ │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use webgame_devserver::build::SourceWatcher;
use webgame_devserver::config::{self, BuildMode, ServerConfig};
use webgame_devserver::lifecycle::signals;
use webgame_devserver::net::{self, listener::browse_url};
use webgame_devserver::observability::{logging, metrics};
use webgame_devserver::{AssetStore, BuildPipeline, HttpServer, Shutdown};

/// Development server for the browser game client.
#[derive(Debug, Parser)]
#[command(name = "webgame-devserver", version, about)]
struct Cli {
    /// TOML config file.
    #[arg(long, env = "WEBGAME_DEVSERVER_CONFIG")]
    config: Option<PathBuf>,

    /// Build mode: `production` compresses responses and disables watching.
    #[arg(long)]
    mode: Option<BuildMode>,

    /// Interface to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind.
    #[arg(long)]
    port: Option<u16>,

    /// Directory to serve.
    #[arg(long)]
    static_root: Option<PathBuf>,

    /// Serve `static_root` as it is, without building.
    #[arg(long)]
    no_build: bool,

    /// Build once, do not rebuild on change.
    #[arg(long)]
    no_watch: bool,
}

impl Cli {
    fn load(&self) -> Result<ServerConfig, config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => config::loader::read_config(path)?,
            None => ServerConfig::default(),
        };

        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(host) = &self.host {
            config.listener.host = host.clone();
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(root) = &self.static_root {
            config.static_root = root.clone();
        }
        if self.no_build {
            config.build.enabled = false;
        }
        if self.no_watch {
            config.build.watch = Some(false);
        }

        config::loader::ensure_valid(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    logging::init(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "webgame-devserver starting");
    tracing::info!(
        mode = %config.mode,
        bind_address = %config.bind_address(),
        static_root = %config.static_root.display(),
        routes = config.routes.len(),
        compress = config.compress_responses(),
        build = config.build.enabled,
        watch = config.build.enabled && config.watch(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let assets = AssetStore::new(config.static_root.clone());

    let mut watcher_task = None;
    if config.build.enabled {
        let pipeline = Arc::new(BuildPipeline::new(&config, assets.clone()));
        pipeline.clean_stale();

        if let Err(e) = pipeline.build_once().await {
            if config.mode.is_production() {
                return Err(e.into());
            }
            tracing::warn!(error = %e, "Initial build failed, serving existing assets");
        }

        if config.watch() {
            let watcher = SourceWatcher::new(&pipeline);
            watcher_task = Some(watcher.spawn(Arc::clone(&pipeline), shutdown.subscribe())?);
        }
    }

    let server = HttpServer::new(config.clone(), assets)?;
    let listener = net::bind(&config).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(url = %browse_url(local_addr), "Dev server ready");

    signals::spawn_signal_handler(&shutdown);
    server.run(listener, shutdown.subscribe()).await?;

    shutdown.trigger();
    if let Some(task) = watcher_task {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
