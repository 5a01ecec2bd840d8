//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, targets parse)
//! - Detect shadowed routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::ServerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener host must not be empty")]
    EmptyHost,

    #[error("static_root must not be empty")]
    EmptyStaticRoot,

    #[error("route #{index}: path prefix {prefix:?} must start with '/'")]
    InvalidPrefix { index: usize, prefix: String },

    #[error("route #{index}: path prefix {prefix:?} is declared twice")]
    DuplicatePrefix { index: usize, prefix: String },

    #[error("route #{index}: path prefix {prefix:?} is unreachable behind earlier prefix {shadowed_by:?}")]
    ShadowedPrefix {
        index: usize,
        prefix: String,
        shadowed_by: String,
    },

    #[error("route #{index}: invalid target {target:?}: {reason}")]
    InvalidTarget {
        index: usize,
        target: String,
        reason: String,
    },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("build.artifact_name {0:?} must be a plain file stem")]
    InvalidArtifactName(String),

    #[error("build.compiler must name a command when building is enabled")]
    EmptyCompiler,
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.static_root.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyStaticRoot);
    }

    validate_routes(config, &mut errors);

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    let name = &config.build.artifact_name;
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        errors.push(ValidationError::InvalidArtifactName(name.clone()));
    }
    if config.build.enabled && config.build.compiler.is_empty() {
        errors.push(ValidationError::EmptyCompiler);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_routes(config: &ServerConfig, errors: &mut Vec<ValidationError>) {
    for (index, rule) in config.routes.iter().enumerate() {
        let prefix = &rule.path_prefix;
        if !prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPrefix {
                index,
                prefix: prefix.clone(),
            });
        }

        // First match wins, so an earlier prefix that is itself a prefix of
        // this one makes this rule dead.
        for earlier in &config.routes[..index] {
            if earlier.path_prefix == *prefix {
                errors.push(ValidationError::DuplicatePrefix {
                    index,
                    prefix: prefix.clone(),
                });
                break;
            }
            if prefix.starts_with(&earlier.path_prefix) {
                errors.push(ValidationError::ShadowedPrefix {
                    index,
                    prefix: prefix.clone(),
                    shadowed_by: earlier.path_prefix.clone(),
                });
                break;
            }
        }

        if let Err(reason) = check_target(&rule.target) {
            errors.push(ValidationError::InvalidTarget {
                index,
                target: rule.target.clone(),
                reason,
            });
        }
    }
}

fn check_target(target: &str) -> Result<Url, String> {
    let url = Url::parse(target).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme {:?}, expected http", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("query and fragment are not allowed".to_string());
    }
    Ok(url)
}
