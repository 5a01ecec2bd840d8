//! Served asset trees.
//!
//! # Data Flow
//! ```text
//! build pipeline writes generation dir
//!     → AssetStore::publish (atomic swap)
//!     → request handlers: AssetStore::current() snapshot
//!     → retired trees pruned once unreferenced
//! ```

pub mod mime;
pub mod store;

pub use store::{AssetStore, AssetTree};
