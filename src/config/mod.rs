//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (ServerConfig::for_mode)
//!     → loader.rs (optional TOML file)
//!     → CLI overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the server starts; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::BuildConfig;
pub use schema::BuildMode;
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::RouteRule;
pub use schema::ServerConfig;
pub use schema::TimeoutConfig;
