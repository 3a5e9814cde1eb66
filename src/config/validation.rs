//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that routes compile and rewrite targets only use known captures
//! - Validate value ranges (timeouts > 0, statuses in range, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HostConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::{HostConfig, ProcessorConfig};
use crate::routing::Pattern;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One semantic problem in a configuration file.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &HostConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be greater than 0"));
    }

    match Url::parse(&config.upstream.origin) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(_) => errors.push(ValidationError::new("upstream.origin", "scheme must be http or https")),
        Err(e) => errors.push(ValidationError::new("upstream.origin", e.to_string())),
    }
    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.sessions.idle_timeout_secs == 0 {
        errors.push(ValidationError::new("sessions.idle_timeout_secs", "must be greater than 0"));
    }
    if config.sessions.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("sessions.sweep_interval_secs", "must be greater than 0"));
    }

    validate_service(config, &mut errors);
    validate_routes(config, &mut errors);

    for (section, headers) in [
        ("filters.request_headers", &config.filters.request_headers),
        ("filters.response_headers", &config.filters.response_headers),
    ] {
        for (name, value) in headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::new(section, format!("invalid header name {:?}", name)));
            }
            if HeaderValue::from_str(value).is_err() {
                errors.push(ValidationError::new(
                    section,
                    format!("invalid value for header {:?}", name),
                ));
            }
        }
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("must be one of {}", LOG_LEVELS.join(", ")),
        ));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a socket address", observability.metrics_address),
        ));
    }

    if config.admin.enabled && (!config.admin.path.starts_with('/') || config.admin.path.len() < 2) {
        errors.push(ValidationError::new(
            "admin.path",
            "must start with '/' and not be the root path",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_service(config: &HostConfig, errors: &mut Vec<ValidationError>) {
    let service = &config.service;
    if service.version.is_empty() {
        errors.push(ValidationError::new("service.version", "must not be empty"));
    } else if service.version.contains(['/', '\\', '\0']) {
        errors.push(ValidationError::new(
            "service.version",
            "must not contain path separators",
        ));
    }

    let scope = match Url::parse(&service.scope) {
        Ok(scope) if !scope.cannot_be_a_base() => Some(scope),
        Ok(_) => {
            errors.push(ValidationError::new("service.scope", "must be a hierarchical URL"));
            None
        }
        Err(e) => {
            errors.push(ValidationError::new("service.scope", e.to_string()));
            None
        }
    };

    for (i, entry) in service.manifest.iter().enumerate() {
        let field = format!("service.manifest[{}]", i);
        if entry.trim().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        } else if let Some(scope) = &scope {
            if scope.join(entry).is_err() {
                errors.push(ValidationError::new(field, format!("{:?} does not resolve against the scope", entry)));
            }
        }
    }
}

fn validate_routes(config: &HostConfig, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();

    for (i, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{}]", i);
        let pattern = match Pattern::parse(&route.pattern) {
            Ok(pattern) => pattern,
            Err(e) => {
                errors.push(ValidationError::new(format!("{}.pattern", field), e.to_string()));
                continue;
            }
        };
        if !seen.insert(route.pattern.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.pattern", field),
                format!("{:?} repeats an earlier route and can never match", route.pattern),
            ));
        }
        if config.admin.enabled && route.pattern.starts_with(&config.admin.path) {
            errors.push(ValidationError::new(
                format!("{}.pattern", field),
                "overlaps the admin path",
            ));
        }

        match &route.processor {
            ProcessorConfig::Static {
                status,
                content_type,
                ..
            } => {
                if !(100..=599).contains(status) {
                    errors.push(ValidationError::new(
                        format!("{}.processor.status", field),
                        format!("{} is not an HTTP status", status),
                    ));
                }
                if let Some(ct) = content_type {
                    if HeaderValue::from_str(ct).is_err() {
                        errors.push(ValidationError::new(
                            format!("{}.processor.content_type", field),
                            "invalid header value",
                        ));
                    }
                }
            }
            ProcessorConfig::Rewrite { target } => {
                if !target.starts_with('/') {
                    errors.push(ValidationError::new(
                        format!("{}.processor.target", field),
                        "must start with '/'",
                    ));
                }
                let captures: HashSet<&str> = pattern.capture_names().collect();
                for name in target.split('/').filter_map(|s| s.strip_prefix(':')) {
                    if !captures.contains(name) {
                        errors.push(ValidationError::new(
                            format!("{}.processor.target", field),
                            format!("unknown capture {:?}", name),
                        ));
                    }
                }
            }
        }
    }
}
