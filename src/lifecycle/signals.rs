//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl-C) or SIGTERM
//! - Translate the first one into a shutdown trigger
//! - Exit immediately on a second one
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Tokio keeps its handlers installed, so the second signal is handled
//!   here rather than by the OS default

use std::future::Future;

use crate::lifecycle::Shutdown;

/// Exit status after a forced stop (128 + SIGINT).
const FORCED_EXIT_CODE: i32 = 130;

/// Resolve when the process is asked to stop.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "Signal received"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "Signal received"),
    }
}

/// Trigger `shutdown` on the first signal, exit the process on the second.
pub fn spawn_signal_handler(shutdown: &Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(handle_signals(shutdown.clone(), wait_for_signal, || {
        std::process::exit(FORCED_EXIT_CODE);
    }))
}

async fn handle_signals<S, F>(shutdown: Shutdown, mut next_signal: S, force_exit: impl FnOnce())
where
    S: FnMut() -> F,
    F: Future<Output = ()>,
{
    next_signal().await;
    shutdown.trigger();

    next_signal().await;
    tracing::warn!("Second signal received, exiting without draining");
    force_exit();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc, Mutex};

    #[tokio::test]
    async fn first_signal_drains_second_forces_exit() {
        let shutdown = Shutdown::new();
        let mut server = shutdown.subscribe();
        let (tx, rx) = mpsc::unbounded_channel::<()>();
        let rx = Arc::new(Mutex::new(rx));
        let exited = Arc::new(AtomicBool::new(false));

        let next_signal = move || {
            let rx = Arc::clone(&rx);
            async move {
                rx.lock().await.recv().await;
            }
        };
        let flag = Arc::clone(&exited);
        let task = tokio::spawn(handle_signals(shutdown.clone(), next_signal, move || {
            flag.store(true, Ordering::SeqCst)
        }));

        tx.send(()).unwrap();
        assert!(server.recv().await.is_ok());
        assert!(!exited.load(Ordering::SeqCst));

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert!(exited.load(Ordering::SeqCst));
    }
}
