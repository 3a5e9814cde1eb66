//! Filter traits and the pipeline composed around the router.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tower::BoxError;

use crate::error::RequestError;
use crate::http::{Request, Response};

/// Transforms a request before routing.
#[async_trait]
pub trait RequestFilter: Send + Sync {
    async fn filter(&self, request: Request) -> Result<Request, BoxError>;
}

/// Transforms a routed response before delivery.
#[async_trait]
pub trait ResponseFilter: Send + Sync {
    async fn filter(&self, response: Response) -> Result<Response, BoxError>;
}

pub struct FnRequestFilter<F> {
    f: F,
}

pub struct FnResponseFilter<F> {
    f: F,
}

/// Wrap an async closure as a [`RequestFilter`].
pub fn request_filter_fn<F, Fut>(f: F) -> FnRequestFilter<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Request, BoxError>> + Send + 'static,
{
    FnRequestFilter { f }
}

/// Wrap an async closure as a [`ResponseFilter`].
pub fn response_filter_fn<F, Fut>(f: F) -> FnResponseFilter<F>
where
    F: Fn(Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    FnResponseFilter { f }
}

#[async_trait]
impl<F, Fut> RequestFilter for FnRequestFilter<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Request, BoxError>> + Send + 'static,
{
    async fn filter(&self, request: Request) -> Result<Request, BoxError> {
        (self.f)(request).await
    }
}

#[async_trait]
impl<F, Fut> ResponseFilter for FnResponseFilter<F>
where
    F: Fn(Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    async fn filter(&self, response: Response) -> Result<Response, BoxError> {
        (self.f)(response).await
    }
}

/// Optional request and response filters.
#[derive(Clone, Default)]
pub struct FilterPipeline {
    request: Option<Arc<dyn RequestFilter>>,
    response: Option<Arc<dyn ResponseFilter>>,
}

impl FilterPipeline {
    pub fn new(
        request: Option<Arc<dyn RequestFilter>>,
        response: Option<Arc<dyn ResponseFilter>>,
    ) -> Self {
        Self { request, response }
    }

    pub fn set_request_filter(&mut self, filter: Arc<dyn RequestFilter>) {
        self.request = Some(filter);
    }

    pub fn set_response_filter(&mut self, filter: Arc<dyn ResponseFilter>) {
        self.response = Some(filter);
    }

    pub fn has_request_filter(&self) -> bool {
        self.request.is_some()
    }

    pub fn has_response_filter(&self) -> bool {
        self.response.is_some()
    }

    pub async fn apply_request_filter(&self, request: Request) -> Result<Request, RequestError> {
        match &self.request {
            Some(filter) => filter.filter(request).await.map_err(RequestError::RequestFilter),
            None => Ok(request),
        }
    }

    pub async fn apply_response_filter(&self, response: Response) -> Result<Response, RequestError> {
        match &self.response {
            Some(filter) => filter
                .filter(response)
                .await
                .map_err(RequestError::ResponseFilter),
            None => Ok(response),
        }
    }
}

impl fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("request", &self.request.is_some())
            .field("response", &self.response.is_some())
            .finish()
    }
}
