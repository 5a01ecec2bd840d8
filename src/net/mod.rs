//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, fail fast on port conflicts)
//!     → connection.rs (lifecycle phases, tunnel tracking)
//!     → Hand off to HTTP layer
//!
//! Connection Phases:
//!     Idle → Matched → (Proxying | Serving | NotFound) → Closed
//! ```

pub mod connection;
pub mod listener;

pub use connection::{ConnectionPhase, ConnectionTracker};
pub use listener::{bind, ListenerError};
