//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML document without semantic checks.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Read and parse a TOML file without semantic checks.
///
/// Callers that layer CLI overrides on top validate afterwards with
/// [`ensure_valid`].
pub fn read_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    ensure_valid(read_config(path)?)
}

/// Run semantic validation, handing the config back on success.
pub fn ensure_valid(config: ServerConfig) -> Result<ServerConfig, ConfigError> {
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BuildMode, LogFormat};

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.port, 8001);
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.mode, BuildMode::Development);
    }

    #[test]
    fn parses_full_document() {
        let config = parse_config(
            r#"
            mode = "production"
            static_root = "public"
            compress_responses = false

            [listener]
            host = "127.0.0.1"
            port = 9001

            [[routes]]
            path_prefix = "/api"
            target = "http://127.0.0.1:9100"
            websocket = false

            [[routes]]
            path_prefix = "/ws"
            target = "http://127.0.0.1:9200"
            rewrite_origin = false

            [build]
            artifact_name = "game"
            compiler = ["make", "$OUT_DIR"]

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, BuildMode::Production);
        assert_eq!(config.bind_address(), "127.0.0.1:9001");
        assert!(!config.compress_responses());
        assert_eq!(config.routes.len(), 2);
        assert!(config.routes[0].rewrite_origin);
        assert!(!config.routes[0].websocket);
        assert!(!config.routes[1].rewrite_origin);
        assert!(config.routes[1].websocket);
        assert_eq!(config.build.artifact_name, "game");
        assert_eq!(config.build.static_dir, PathBuf::from("static"));
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn unknown_mode_falls_back_to_development() {
        assert_eq!(parse_config("mode = \"banana\"").unwrap().mode, BuildMode::Development);
        assert_eq!(parse_config("mode = \"Production\"").unwrap().mode, BuildMode::Production);
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        let err = parse_config("listener = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn semantic_errors_are_reported_together() {
        let config = parse_config(
            r#"
            [[routes]]
            path_prefix = "/"
            target = "http://127.0.0.1:1"

            [[routes]]
            path_prefix = "/ws"
            target = "http://127.0.0.1:2"

            [timeouts]
            request_secs = 0
            "#,
        )
        .unwrap();

        match ensure_valid(config) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn sample_config_is_valid() {
        let config = load_config(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/devserver.toml"))).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8001");
        assert_eq!(config.routes[0].target, "http://127.0.0.1:8002");
        assert_eq!(config.build.compiler.len(), 11);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
