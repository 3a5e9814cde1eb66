//! Route processors.
//!
//! A processor turns a routed request (captures already attached) into a
//! response. Errors are returned to the router, which reports them as route
//! failures; a processor never falls back to the network on its own.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tower::BoxError;
use url::Url;

use crate::http::{Params, Request, Response};
use crate::net::NetworkTransport;

/// Produces the response for a routed request.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, request: Request) -> Result<Response, BoxError>;
}

/// Processor backed by an async closure.
#[derive(Clone)]
pub struct FnProcessor<F> {
    f: F,
}

/// Wrap an async closure as a [`Processor`].
pub fn processor_fn<F, Fut>(f: F) -> FnProcessor<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    FnProcessor { f }
}

#[async_trait]
impl<F, Fut> Processor for FnProcessor<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    async fn process(&self, request: Request) -> Result<Response, BoxError> {
        (self.f)(request).await
    }
}

/// Answers with a fixed response.
#[derive(Debug, Clone)]
pub struct StaticProcessor {
    response: Response,
}

impl StaticProcessor {
    pub fn new(response: Response) -> Self {
        Self { response }
    }
}

#[async_trait]
impl Processor for StaticProcessor {
    async fn process(&self, _request: Request) -> Result<Response, BoxError> {
        Ok(self.response.clone())
    }
}

/// Rewrites the path from a template and fetches it from the network.
///
/// `:name` segments of the template are replaced by the captures of the same
/// name; the query string of the original request is kept.
pub struct RewriteProcessor {
    target: String,
    transport: Arc<dyn NetworkTransport>,
}

impl RewriteProcessor {
    pub fn new(target: impl Into<String>, transport: Arc<dyn NetworkTransport>) -> Self {
        Self {
            target: target.into(),
            transport,
        }
    }

    /// Expand the template with `params`. Unknown captures are an error.
    pub fn expand(&self, params: &Params) -> Result<String, BoxError> {
        let mut segments = Vec::new();
        for segment in self.target.split('/') {
            match segment.strip_prefix(':') {
                Some(name) => {
                    let value = params
                        .get(name)
                        .ok_or_else(|| format!("rewrite target references unknown capture {:?}", name))?;
                    segments.push(value);
                }
                None => segments.push(segment),
            }
        }
        Ok(segments.join("/"))
    }

    fn rewritten_url(&self, url: &Url, path: &str) -> Url {
        let mut rewritten = url.clone();
        rewritten.set_path(path);
        rewritten
    }
}

#[async_trait]
impl Processor for RewriteProcessor {
    async fn process(&self, mut request: Request) -> Result<Response, BoxError> {
        let path = self.expand(request.params())?;
        let url = self.rewritten_url(request.url(), &path);
        tracing::debug!(from = %request.url(), to = %url, "Rewriting request");
        request.set_url(url);
        Ok(self.transport.fetch(&request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;

    struct EchoUrl;

    #[async_trait]
    impl NetworkTransport for EchoUrl {
        async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
            Ok(Response::ok(request.url().to_string()))
        }
    }

    fn routed(url: &str, params: &[(&str, &str)]) -> Request {
        let mut request = Request::get(Url::parse(url).unwrap());
        request.set_params(params.iter().copied().collect());
        request
    }

    #[tokio::test]
    async fn test_fn_processor() {
        let p = processor_fn(|req: Request| async move {
            Ok::<_, BoxError>(Response::ok(format!("id={}", req.params().get("id").unwrap_or("-"))))
        });
        let resp = p.process(routed("http://localhost/api/42", &[("id", "42")])).await.unwrap();
        assert_eq!(resp.body().as_ref(), b"id=42");
    }

    #[tokio::test]
    async fn test_static_processor() {
        let p = StaticProcessor::new(Response::new(204, ""));
        let resp = p.process(routed("http://localhost/ping", &[])).await.unwrap();
        assert_eq!(resp.status(), 204);
    }

    #[tokio::test]
    async fn test_rewrite_processor() {
        let p = RewriteProcessor::new("/v1/items/:id", Arc::new(EchoUrl));
        let resp = p
            .process(routed("http://localhost/api/42?full=1", &[("id", "42")]))
            .await
            .unwrap();
        assert_eq!(resp.body().as_ref(), b"http://localhost/v1/items/42?full=1");
    }

    #[tokio::test]
    async fn test_rewrite_unknown_capture() {
        let p = RewriteProcessor::new("/v1/:missing", Arc::new(EchoUrl));
        let err = p.process(routed("http://localhost/api/42", &[])).await.unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
