//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind to the configured host and port
//! - Report bind failures (port in use, unknown host) before serving starts

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Bind the listener described by `config`.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ListenerError> {
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ListenerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
        addr: addr.clone(),
        source,
    })?;

    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}

/// URL a browser on this machine should open.
pub fn browse_url(local_addr: SocketAddr) -> String {
    if local_addr.ip().is_unspecified() {
        format!("http://localhost:{}", local_addr.port())
    } else {
        format!("http://{}", local_addr)
    }
}
