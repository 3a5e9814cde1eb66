//! Configuration schema definitions.
//!
//! This module defines the host configuration file of the interceptor.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::configuration::DEFAULT_SCOPE;

/// Root configuration of the interceptor host.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HostConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Network origin used for fallback and manifest fetches.
    pub upstream: UpstreamConfig,

    /// The deployable service build.
    pub service: ServiceConfig,

    /// Routes, tried in declaration order.
    pub routes: Vec<RouteConfig>,

    /// Header filters around routed requests.
    pub filters: FilterConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Client session expiry.
    pub sessions: SessionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest accepted request body; larger bodies get 413.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL requests are forwarded to (e.g., "http://127.0.0.1:3000").
    pub origin: String,

    /// Per-fetch timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:3000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// The service build to deploy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Build identifier; also the name of its cache bucket.
    pub version: String,

    /// Resources stored at install time, resolved against `scope`.
    pub manifest: Vec<String>,

    /// Supersede the active build as soon as this one is installed.
    pub skip_waiting: bool,

    /// Base URL of intercepted requests.
    pub scope: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: String::new(),
            manifest: Vec::new(),
            skip_waiting: true,
            scope: DEFAULT_SCOPE.to_string(),
        }
    }
}

/// One route: a path pattern and what answers it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path pattern, e.g. `/api/:id` or `/static/*path`.
    pub pattern: String,

    pub processor: ProcessorConfig,
}

/// Built-in processors available from configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessorConfig {
    /// Fixed response.
    Static {
        #[serde(default = "default_status")]
        status: u16,
        #[serde(default)]
        body: String,
        #[serde(default)]
        content_type: Option<String>,
    },

    /// Fetch a rewritten path, e.g. `/v2/items/:id`.
    Rewrite { target: String },
}

fn default_status() -> u16 {
    200
}

/// Header filters.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Set on every routed request.
    pub request_headers: BTreeMap<String, String>,

    /// Set on every routed response.
    pub response_headers: BTreeMap<String, String>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Client session expiry.
///
/// A waiting build activates once the sessions of the active build expire.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// A session not seen for this many seconds is dropped.
    pub idle_timeout_secs: u64,

    /// How often idle sessions are swept, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 300,
            sweep_interval_secs: 15,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Address of the Prometheus endpoint.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,

    /// Path prefix of admin endpoints; never intercepted.
    pub path: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/_interceptor".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: HostConfig = toml::from_str(
            r#"
            [service]
            version = "v1"
            "#,
        )
        .unwrap();

        assert_eq!(config.service.version, "v1");
        assert!(config.service.skip_waiting);
        assert_eq!(config.service.scope, DEFAULT_SCOPE);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_processor_kinds() {
        let config: HostConfig = toml::from_str(
            r#"
            [[routes]]
            pattern = "/health"
            processor = { kind = "static", body = "ok" }

            [[routes]]
            pattern = "/api/:id"
            processor = { kind = "rewrite", target = "/v2/items/:id" }
            "#,
        )
        .unwrap();

        assert_eq!(
            config.routes[0].processor,
            ProcessorConfig::Static {
                status: 200,
                body: "ok".to_string(),
                content_type: None,
            }
        );
        assert_eq!(
            config.routes[1].processor,
            ProcessorConfig::Rewrite {
                target: "/v2/items/:id".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_processor_kind_rejected() {
        let result: Result<HostConfig, _> = toml::from_str(
            r#"
            [[routes]]
            pattern = "/x"
            processor = { kind = "lambda" }
            "#,
        );
        assert!(result.is_err());
    }
}
