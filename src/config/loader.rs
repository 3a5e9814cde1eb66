//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;
use tower::BoxError;

use crate::config::schema::HostConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::error::NetworkError;
use crate::routing::PatternError;

/// Error type for configuration loading and compilation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("invalid route {pattern}: {source}")]
    Route {
        pattern: String,
        #[source]
        source: PatternError,
    },

    #[error("invalid url {url:?}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid filter: {0}")]
    Filter(#[source] BoxError),

    #[error("invalid upstream: {0}")]
    Upstream(#[from] NetworkError),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<HostConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<HostConfig, ConfigError> {
    let config: HostConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
