//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, headers)
//!     → router.rs (ordered route lookup)
//!     → matcher.rs (prefix + upgrade detection)
//!     → Return: Proxy(route) or Static
//!
//! Route Compilation (at startup):
//!     RouteRule[] (declaration order)
//!     → Parse targets into Upstream
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (declaration order, more specific prefixes first)

pub mod matcher;
pub mod router;

pub use matcher::{is_websocket_upgrade, PathPrefixMatcher};
pub use router::{Route, RouteError, RouteMatch, Router, Upstream};
