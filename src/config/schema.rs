//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dev server.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Build mode selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// One-shot optimized build, compressed responses, no watching.
    Production,
    /// Debug build, uncompressed responses, rebuild on change.
    #[default]
    Development,
}

impl BuildMode {
    pub fn is_production(self) -> bool {
        self == BuildMode::Production
    }

    /// Profile flag handed to the compiler collaborator.
    pub fn profile_flag(self) -> &'static str {
        match self {
            BuildMode::Production => "--release",
            BuildMode::Development => "--dev",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Production => f.write_str("production"),
            BuildMode::Development => f.write_str("development"),
        }
    }
}

impl FromStr for BuildMode {
    type Err = String;

    /// Anything other than `production` is a development build.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("production") {
            Ok(BuildMode::Production)
        } else {
            Ok(BuildMode::Development)
        }
    }
}

impl<'de> Deserialize<'de> for BuildMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<BuildMode>().map_err(serde::de::Error::custom)
    }
}

/// Root configuration for the dev server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Build mode. Normally set from the CLI, not the file.
    pub mode: BuildMode,

    /// Listener configuration (host, port).
    pub listener: ListenerConfig,

    /// Directory the built assets are served from.
    pub static_root: PathBuf,

    /// Proxy rules, evaluated in declaration order.
    pub routes: Vec<RouteRule>,

    /// Compress static responses. Defaults to `true` in production.
    pub compress_responses: Option<bool>,

    /// Build orchestration settings.
    pub build: BuildConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: BuildMode::default(),
            listener: ListenerConfig::default(),
            static_root: PathBuf::from("dist"),
            routes: vec![RouteRule::default()],
            compress_responses: None,
            build: BuildConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Default configuration for the given build mode.
    pub fn for_mode(mode: BuildMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Whether static responses are compressed.
    pub fn compress_responses(&self) -> bool {
        self.compress_responses
            .unwrap_or_else(|| self.mode.is_production())
    }

    /// Whether sources are watched and rebuilt on change.
    pub fn watch(&self) -> bool {
        self.build.watch.unwrap_or_else(|| !self.mode.is_production())
    }

    /// `host:port` string the listener binds to.
    pub fn bind_address(&self) -> String {
        if self.listener.host.contains(':') {
            format!("[{}]:{}", self.listener.host, self.listener.port)
        } else {
            format!("{}:{}", self.listener.host, self.listener.port)
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Port to bind. `0` picks an ephemeral port.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
        }
    }
}

/// A path-prefix forwarding rule.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteRule {
    /// Path prefix to match (case-sensitive, string prefix).
    pub path_prefix: String,

    /// Forwarding target, e.g. `http://127.0.0.1:8002`.
    pub target: String,

    /// Replace `Origin` and `Host` with the target's before forwarding.
    #[serde(default = "default_true")]
    pub rewrite_origin: bool,

    /// Tunnel WebSocket upgrade requests.
    #[serde(default = "default_true")]
    pub websocket: bool,
}

impl Default for RouteRule {
    fn default() -> Self {
        Self {
            path_prefix: "/ws".to_string(),
            target: "http://127.0.0.1:8002".to_string(),
            rewrite_origin: true,
            websocket: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Build orchestration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Skip building entirely and serve `static_root` as it is.
    pub enabled: bool,

    /// Root handed to the compiler (`$SOURCE_ROOT`).
    pub source_root: PathBuf,

    /// Directory copied verbatim into the output.
    pub static_dir: PathBuf,

    /// Base name of the compiler artifacts (`<name>.js`, `<name>.wasm`).
    pub artifact_name: String,

    /// Compiler argv. `$SOURCE_ROOT`, `$OUT_DIR`, `$OUT_NAME` and `$PROFILE`
    /// are substituted before running.
    pub compiler: Vec<String>,

    /// Rebuild on source change. Defaults to `true` outside production.
    pub watch: Option<bool>,

    /// Quiet period before a rebuild starts, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_root: PathBuf::from("."),
            static_dir: PathBuf::from("static"),
            artifact_name: "webgame".to_string(),
            compiler: [
                "wasm-pack",
                "build",
                "$SOURCE_ROOT",
                "--target",
                "no-modules",
                "--no-typescript",
                "--out-dir",
                "$OUT_DIR",
                "--out-name",
                "$OUT_NAME",
                "$PROFILE",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            watch: None,
            debounce_ms: 300,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed to produce response headers, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub log_level: String,

    /// Human readable or JSON lines.
    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_layout() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8001");
        assert_eq!(config.static_root, PathBuf::from("dist"));
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].path_prefix, "/ws");
        assert_eq!(config.routes[0].target, "http://127.0.0.1:8002");
        assert!(config.routes[0].rewrite_origin);
        assert!(config.routes[0].websocket);
    }

    #[test]
    fn mode_drives_compression_and_watch() {
        let prod = ServerConfig::for_mode(BuildMode::Production);
        assert!(prod.compress_responses());
        assert!(!prod.watch());

        let dev = ServerConfig::for_mode(BuildMode::Development);
        assert!(!dev.compress_responses());
        assert!(dev.watch());

        let mut forced = ServerConfig::for_mode(BuildMode::Development);
        forced.compress_responses = Some(true);
        forced.build.watch = Some(false);
        assert!(forced.compress_responses());
        assert!(!forced.watch());
    }

    #[test]
    fn unknown_mode_is_development() {
        assert_eq!("production".parse::<BuildMode>(), Ok(BuildMode::Production));
        assert_eq!("none".parse::<BuildMode>(), Ok(BuildMode::Development));
    }

    #[test]
    fn ipv6_bind_address_is_bracketed() {
        let mut config = ServerConfig::default();
        config.listener.host = "::1".into();
        config.listener.port = 9000;
        assert_eq!(config.bind_address(), "[::1]:9000");
    }
}
