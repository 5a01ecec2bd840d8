//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, dispatch)
//!     → routing table decides proxy route or static
//!         → proxy.rs (plain HTTP forward)
//!         → websocket.rs (upgrade handshake + byte splice)
//!         → static_files.rs (current asset tree)
//!     → response.rs (gateway errors, hop-by-hop stripping)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;
pub mod websocket;

pub use request::X_REQUEST_ID;
pub use response::ProxyError;
pub use server::HttpServer;
