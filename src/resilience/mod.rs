//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (enforce connect timeout)
//!     → On failure: gateway error to the client, no retry
//! ```
//!
//! # Design Decisions
//! - Every upstream connect has a deadline
//! - The proxy never retries; WebSocket clients own reconnection

pub mod timeouts;
