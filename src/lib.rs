//! Development server for the browser game client.
//!
//! Serves the compiled WASM module, its loader script and the static assets,
//! forwards `/ws` (HTTP and WebSocket) to the game backend, and rebuilds the
//! assets on source changes.

// Core subsystems
pub mod assets;
pub mod build;
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use assets::AssetStore;
pub use build::BuildPipeline;
pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
