//! Header-setting filters.

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use tower::BoxError;

use crate::filter::pipeline::{RequestFilter, ResponseFilter};
use crate::http::{Request, Response};

/// Sets fixed headers on every routed request, replacing existing values.
#[derive(Debug, Clone, Default)]
pub struct SetRequestHeaders {
    headers: HeaderMap,
}

impl SetRequestHeaders {
    pub fn new<'a, I>(headers: I) -> Result<Self, BoxError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }
        Ok(Self { headers: map })
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

#[async_trait]
impl RequestFilter for SetRequestHeaders {
    async fn filter(&self, mut request: Request) -> Result<Request, BoxError> {
        for (name, value) in &self.headers {
            request.headers_mut().insert(name.clone(), value.clone());
        }
        Ok(request)
    }
}

/// Sets fixed headers on every routed response, replacing existing values.
#[derive(Debug, Clone, Default)]
pub struct SetResponseHeaders {
    headers: Vec<(String, String)>,
}

impl SetResponseHeaders {
    pub fn new<'a, I>(headers: I) -> Result<Self, BoxError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut list = Vec::new();
        for (name, value) in headers {
            // Validate up front so delivery never drops them.
            HeaderName::from_bytes(name.as_bytes())?;
            HeaderValue::from_str(value)?;
            list.push((name.to_string(), value.to_string()));
        }
        Ok(Self { headers: list })
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

#[async_trait]
impl ResponseFilter for SetResponseHeaders {
    async fn filter(&self, mut response: Response) -> Result<Response, BoxError> {
        for (name, value) in &self.headers {
            response.set_header(name.as_str(), value.as_str());
        }
        Ok(response)
    }
}
