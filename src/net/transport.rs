//! Network transport used for fallback fetches and manifest population.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use url::Url;

use crate::error::NetworkError;
use crate::http::response::is_hop_by_hop;
use crate::http::{Request, Response};

/// Issues requests to the live network.
#[async_trait]
pub trait NetworkTransport: Send + Sync {
    /// Fetch `request`, returning the upstream response untouched.
    ///
    /// Non-2xx statuses are responses, not errors.
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// Transport that forwards to a fixed upstream origin over HTTP.
///
/// The path and query of the intercepted request are kept; scheme, host and
/// port come from the origin.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    origin: Url,
}

impl HttpTransport {
    pub fn new(origin: Url, timeout: Duration) -> Result<Self, NetworkError> {
        if origin.cannot_be_a_base() {
            return Err(NetworkError::InvalidUrl(origin.to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;
        Ok(Self { client, origin })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Map an intercepted URL onto the upstream origin.
    pub fn upstream_url(&self, url: &Url) -> Url {
        let mut upstream = self.origin.clone();
        upstream.set_path(url.path());
        upstream.set_query(url.query());
        upstream
    }
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if name == header::HOST || name == header::CONTENT_LENGTH || is_hop_by_hop(name.as_str()) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

#[async_trait]
impl NetworkTransport for HttpTransport {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let url = self.upstream_url(request.url());
        tracing::debug!(method = %request.method(), url = %url, "Fetching from network");

        let upstream = self
            .client
            .request(request.method().clone(), url)
            .headers(forwardable(request.headers()))
            .body(request.body().clone())
            .send()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        let status = upstream.status().as_u16();
        let mut headers = Vec::with_capacity(upstream.headers().len());
        for (name, value) in upstream.headers() {
            if is_hop_by_hop(name.as_str()) {
                continue;
            }
            headers.push((
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            ));
        }

        let body = upstream
            .bytes()
            .await
            .map_err(|e| NetworkError::Body(e.to_string()))?;

        let mut response = Response::new(status, body);
        for (name, value) in headers {
            response.append_header(name, value);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_upstream_url_keeps_path_and_query() {
        let transport = HttpTransport::new(
            Url::parse("http://127.0.0.1:9000").unwrap(),
            Duration::from_secs(5),
        )
        .unwrap();
        let url = Url::parse("http://localhost/api/42?x=1#frag").unwrap();
        assert_eq!(
            transport.upstream_url(&url).as_str(),
            "http://127.0.0.1:9000/api/42?x=1"
        );
    }

    #[test]
    fn test_rejects_non_base_origin() {
        let origin = Url::parse("data:text/plain,hello").unwrap();
        assert!(HttpTransport::new(origin, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_forwardable_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("localhost"));
        headers.insert("connection", HeaderValue::from_static("close"));
        headers.insert("accept", HeaderValue::from_static("*/*"));
        let out = forwardable(&headers);
        assert_eq!(out.len(), 1);
        assert!(out.contains_key("accept"));
    }
}
