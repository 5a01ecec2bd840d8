//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain tunnels → Stop watcher → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Startup order lives in `main`: config, logging, initial build, bind
//! - Shutdown has a deadline: open tunnels get a few seconds, then the
//!   process exits

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
