//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound upstream connection establishment
//! - Keep timeout errors distinct from refusals
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timed-out connects surface as 504 Gateway Timeout, refusals as 502
//! - Established tunnels are never timed out; either peer closing ends them

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;

/// Why an upstream connection could not be established.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("connect to {addr} timed out after {timeout:?}")]
    TimedOut { addr: String, timeout: Duration },

    #[error("connect to {addr} failed: {source}")]
    Io {
        addr: String,
        #[source]
        source: io::Error,
    },
}

/// Open a TCP connection, giving up after `timeout`.
pub async fn connect(addr: &str, timeout: Duration) -> Result<TcpStream, ConnectError> {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            let _ = stream.set_nodelay(true);
            Ok(stream)
        }
        Ok(Err(source)) => Err(ConnectError::Io {
            addr: addr.to_string(),
            source,
        }),
        Err(_) => Err(ConnectError::TimedOut {
            addr: addr.to_string(),
            timeout,
        }),
    }
}

/// True if anything in the error's source chain is an I/O timeout.
pub fn is_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::TimedOut {
                return true;
            }
        }
        current = e.source();
    }
    false
}
