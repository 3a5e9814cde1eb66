//! Core service configuration.
//!
//! Built once per deployable build and shared as `Arc<Configuration>` by the
//! lifecycle controller and the interception engine. There is no way to
//! mutate it after `build()`.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::filter::{FilterPipeline, RequestFilter, ResponseFilter};
use crate::routing::{Pattern, Processor, Router};

/// Base URL manifest entries and incoming paths resolve against by default.
pub const DEFAULT_SCOPE: &str = "http://localhost/";

/// Immutable configuration of one service version.
pub struct Configuration {
    version: String,
    manifest: Vec<String>,
    scope: Url,
    skip_waiting: bool,
    router: Router,
    filters: FilterPipeline,
}

impl Configuration {
    pub fn builder(version: impl Into<String>) -> ConfigurationBuilder {
        ConfigurationBuilder {
            version: version.into(),
            manifest: Vec::new(),
            scope: None,
            skip_waiting: true,
            router: Router::new(),
            filters: FilterPipeline::default(),
        }
    }

    /// Bucket identifier of this build.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn manifest(&self) -> &[String] {
        &self.manifest
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    /// Whether install asks to supersede a waiting predecessor immediately.
    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn filters(&self) -> &FilterPipeline {
        &self.filters
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("version", &self.version)
            .field("manifest", &self.manifest)
            .field("scope", &self.scope.as_str())
            .field("skip_waiting", &self.skip_waiting)
            .field("routes", &self.router.routes())
            .field("filters", &self.filters)
            .finish()
    }
}

/// Builder for [`Configuration`].
pub struct ConfigurationBuilder {
    version: String,
    manifest: Vec<String>,
    scope: Option<Url>,
    skip_waiting: bool,
    router: Router,
    filters: FilterPipeline,
}

impl ConfigurationBuilder {
    /// Append resources to pre-populate at install time.
    pub fn manifest<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manifest.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Append a route; routes are tried in the order they were added.
    pub fn route(mut self, pattern: Pattern, processor: impl Processor + 'static) -> Self {
        self.router.add_route(pattern, Arc::new(processor));
        self
    }

    /// Append a route with a shared processor.
    pub fn route_arc(mut self, pattern: Pattern, processor: Arc<dyn Processor>) -> Self {
        self.router.add_route(pattern, processor);
        self
    }

    pub fn request_filter(mut self, filter: impl RequestFilter + 'static) -> Self {
        self.filters.set_request_filter(Arc::new(filter));
        self
    }

    pub fn response_filter(mut self, filter: impl ResponseFilter + 'static) -> Self {
        self.filters.set_response_filter(Arc::new(filter));
        self
    }

    pub fn scope(mut self, scope: Url) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn skip_waiting(mut self, skip: bool) -> Self {
        self.skip_waiting = skip;
        self
    }

    pub fn build(self) -> Configuration {
        let scope = self.scope.unwrap_or_else(default_scope);
        Configuration {
            version: self.version,
            manifest: self.manifest,
            scope,
            skip_waiting: self.skip_waiting,
            router: self.router,
            filters: self.filters,
        }
    }
}

fn default_scope() -> Url {
    Url::parse(DEFAULT_SCOPE).expect("DEFAULT_SCOPE is a valid URL")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::StaticProcessor;
    use crate::http::Response;

    #[test]
    fn test_builder_defaults() {
        let config = Configuration::builder("v1").build();
        assert_eq!(config.version(), "v1");
        assert!(config.manifest().is_empty());
        assert_eq!(config.scope().as_str(), DEFAULT_SCOPE);
        assert!(config.skip_waiting());
        assert!(config.router().is_empty());
        assert!(!config.filters().has_request_filter());
    }

    #[test]
    fn test_builder_keeps_route_order() {
        let config = Configuration::builder("v2")
            .manifest(["/a.js", "/b.css"])
            .route(Pattern::parse("/x").unwrap(), StaticProcessor::new(Response::ok("x")))
            .route(Pattern::parse("/:any").unwrap(), StaticProcessor::new(Response::ok("any")))
            .skip_waiting(false)
            .build();

        assert_eq!(config.manifest(), &["/a.js".to_string(), "/b.css".to_string()]);
        let patterns: Vec<_> = config.router().routes().iter().map(|r| r.pattern().as_str()).collect();
        assert_eq!(patterns, vec!["/x", "/:any"]);
        assert!(!config.skip_waiting());
    }
}
