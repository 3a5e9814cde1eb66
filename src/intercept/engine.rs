//! Per-request interception.
//!
//! # Data Flow
//! ```text
//! Request ──► cache lookup ──hit──► Response (filters and routes bypassed)
//!                 │ miss
//!                 ▼
//!           request filter ──► router match ──► processor ──► response filter ──► Response
//!                                   │ no match
//!                                   ▼
//!                  network fetch of the original request ──► Response
//! ```

use std::sync::Arc;

use crate::cache::CacheStoreManager;
use crate::config::Configuration;
use crate::error::RequestError;
use crate::http::{Request, Response};
use crate::net::NetworkTransport;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Route,
    Network,
    /// The instance was not active; the request went straight to the network.
    Passthrough,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Route => "route",
            ResponseSource::Network => "network",
            ResponseSource::Passthrough => "passthrough",
        }
    }
}

/// A response with its provenance.
#[derive(Debug, Clone)]
pub struct Intercepted {
    pub response: Response,
    pub source: ResponseSource,
}

pub struct InterceptionEngine {
    config: Arc<Configuration>,
    cache: Arc<CacheStoreManager>,
    transport: Arc<dyn NetworkTransport>,
}

impl InterceptionEngine {
    pub fn new(
        config: Arc<Configuration>,
        cache: Arc<CacheStoreManager>,
        transport: Arc<dyn NetworkTransport>,
    ) -> Self {
        Self {
            config,
            cache,
            transport,
        }
    }

    pub async fn handle(&self, request: Request) -> Result<Intercepted, RequestError> {
        if let Some(response) = self.cache.lookup(&request.key()).await {
            tracing::debug!(key = %request.key(), "Cache hit");
            return Ok(Intercepted {
                response,
                source: ResponseSource::Cache,
            });
        }

        tracing::debug!(key = %request.key(), "Cache miss");
        let filters = self.config.filters();
        let filtered = filters.apply_request_filter(request.clone()).await?;

        if let Some(matched) = self.config.router().match_path(filtered.path()) {
            tracing::debug!(route = %matched.pattern(), path = %filtered.path(), "Route matched");
            let response = matched.dispatch(filtered).await?;
            let response = filters.apply_response_filter(response).await?;
            return Ok(Intercepted {
                response,
                source: ResponseSource::Route,
            });
        }

        let response = self.transport.fetch(&request).await?;
        Ok(Intercepted {
            response,
            source: ResponseSource::Network,
        })
    }
}
