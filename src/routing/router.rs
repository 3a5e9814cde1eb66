//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store routes in declaration order
//! - Resolve a path to the first matching route and its captures
//! - Dispatch the enriched request to that route's processor
//!
//! # Design Decisions
//! - Append-only while building, immutable once shared
//! - First match wins; later routes are never consulted after a match
//! - Explicit no-match (`None`) rather than a silent default; the router never
//!   falls back to the network

use std::fmt;
use std::sync::Arc;

use crate::error::RequestError;
use crate::http::{Params, Request, Response};
use crate::routing::pattern::Pattern;
use crate::routing::processor::Processor;

/// A pattern paired with its processor.
#[derive(Clone)]
pub struct Route {
    pattern: Pattern,
    processor: Arc<dyn Processor>,
}

impl Route {
    pub fn new(pattern: Pattern, processor: Arc<dyn Processor>) -> Self {
        Self { pattern, processor }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Result of a successful match.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    index: usize,
    route: &'a Route,
    params: Params,
}

impl RouteMatch<'_> {
    /// Declaration index of the matched route.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pattern(&self) -> &Pattern {
        &self.route.pattern
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Attach the captures to `request` and run the processor.
    pub async fn dispatch(self, mut request: Request) -> Result<Response, RequestError> {
        request.set_params(self.params);
        tracing::debug!(pattern = %self.route.pattern, path = %request.path(), "Dispatching to route");
        self.route
            .processor
            .process(request)
            .await
            .map_err(|source| RequestError::Route {
                pattern: self.route.pattern.to_string(),
                source,
            })
    }
}

/// Ordered collection of routes.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route after all existing ones.
    pub fn add_route(&mut self, pattern: Pattern, processor: Arc<dyn Processor>) {
        self.routes.push(Route::new(pattern, processor));
    }

    /// First route whose pattern matches `path`.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().enumerate().find_map(|(index, route)| {
            route.pattern.matches(path).map(|params| RouteMatch {
                index,
                route,
                params,
            })
        })
    }

    /// Match and dispatch in one step; `Ok(None)` when no route matches.
    pub async fn dispatch(&self, request: Request) -> Result<Option<Response>, RequestError> {
        match self.match_path(request.path()) {
            Some(matched) => matched.dispatch(request).await.map(Some),
            None => Ok(None),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
