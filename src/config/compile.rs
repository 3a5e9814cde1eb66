//! Turns a validated [`HostConfig`] into a core [`Configuration`].

use std::sync::Arc;

use url::Url;

use crate::config::configuration::Configuration;
use crate::config::loader::ConfigError;
use crate::config::schema::{HostConfig, ProcessorConfig};
use crate::filter::{SetRequestHeaders, SetResponseHeaders};
use crate::http::Response;
use crate::net::NetworkTransport;
use crate::routing::{Pattern, Processor, RewriteProcessor, StaticProcessor};

/// Build the service configuration. Rewrite routes fetch through `transport`.
pub fn build_configuration(
    config: &HostConfig,
    transport: Arc<dyn NetworkTransport>,
) -> Result<Configuration, ConfigError> {
    let service = &config.service;
    let scope = Url::parse(&service.scope).map_err(|source| ConfigError::Url {
        url: service.scope.clone(),
        source,
    })?;

    let mut builder = Configuration::builder(service.version.clone())
        .manifest(service.manifest.iter().cloned())
        .scope(scope)
        .skip_waiting(service.skip_waiting);

    for route in &config.routes {
        let pattern = Pattern::parse(&route.pattern).map_err(|source| ConfigError::Route {
            pattern: route.pattern.clone(),
            source,
        })?;
        let processor: Arc<dyn Processor> = match &route.processor {
            ProcessorConfig::Static {
                status,
                body,
                content_type,
            } => {
                let mut response = Response::new(*status, body.clone());
                if let Some(ct) = content_type {
                    response.set_header("content-type", ct.as_str());
                }
                Arc::new(StaticProcessor::new(response))
            }
            ProcessorConfig::Rewrite { target } => {
                Arc::new(RewriteProcessor::new(target.clone(), transport.clone()))
            }
        };
        builder = builder.route_arc(pattern, processor);
    }

    let filters = &config.filters;
    if !filters.request_headers.is_empty() {
        let headers = SetRequestHeaders::new(
            filters.request_headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )
        .map_err(ConfigError::Filter)?;
        builder = builder.request_filter(headers);
    }
    if !filters.response_headers.is_empty() {
        let headers = SetResponseHeaders::new(
            filters.response_headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )
        .map_err(ConfigError::Filter)?;
        builder = builder.response_filter(headers);
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use crate::error::NetworkError;
    use crate::http::Request;
    use async_trait::async_trait;

    struct Unused;

    #[async_trait]
    impl NetworkTransport for Unused {
        async fn fetch(&self, _request: &Request) -> Result<Response, NetworkError> {
            Err(NetworkError::Transport("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_build_from_toml() {
        let host = parse_config(
            r#"
            [service]
            version = "v2"
            manifest = ["/a.js"]
            skip_waiting = false
            scope = "http://app.test/"

            [[routes]]
            pattern = "/health"
            processor = { kind = "static", status = 204, content_type = "text/plain" }

            [[routes]]
            pattern = "/api/:id"
            processor = { kind = "rewrite", target = "/v2/:id" }

            [filters]
            response_headers = { "x-served-by" = "interceptor" }
            "#,
        )
        .unwrap();

        let config = build_configuration(&host, Arc::new(Unused)).unwrap();
        assert_eq!(config.version(), "v2");
        assert_eq!(config.scope().as_str(), "http://app.test/");
        assert!(!config.skip_waiting());
        assert_eq!(config.router().len(), 2);
        assert!(config.filters().has_response_filter());
        assert!(!config.filters().has_request_filter());

        let url = Url::parse("http://app.test/health").unwrap();
        let response = config.router().dispatch(Request::get(url)).await.unwrap().unwrap();
        assert_eq!(response.status(), 204);
        assert_eq!(response.header("content-type"), Some("text/plain"));
    }
}
