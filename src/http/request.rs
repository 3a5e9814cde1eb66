//! Normalized view of an intercepted request.
//!
//! # Responsibilities
//! - Expose URL, parsed query, best-effort form body and route captures
//! - Derive the cache key (method + URL without fragment)
//!
//! # Design Decisions
//! - Query and form parameters are parsed once, when the URL or body is set
//! - Form parsing never fails; a body that is not form-encoded yields no params
//! - The body is `Bytes` so cloning a request for network fallback is cheap

use std::fmt;

use axum::http::{header::CONTENT_TYPE, HeaderMap, Method};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Ordered multimap of string parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Cache key of a request: method and URL with the fragment removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(format!("{} {}", method, url))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
    query: Params,
    form: Params,
    params: Params,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        let query = url.query_pairs().into_owned().collect();
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            query,
            form: Params::new(),
            params: Params::new(),
        }
    }

    /// Shorthand for a body-less `GET`.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self.form = parse_form(&self.headers, &self.body);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.form = parse_form(&self.headers, &self.body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Replace the URL, re-deriving the query parameters.
    pub fn set_url(&mut self, url: Url) {
        self.query = url.query_pairs().into_owned().collect();
        self.url = url;
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Parsed query string.
    pub fn query(&self) -> &Params {
        &self.query
    }

    /// Body parsed as form parameters; empty when the body is not form-encoded.
    pub fn form(&self) -> &Params {
        &self.form
    }

    /// Captures of the route pattern that matched this request.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }
}

fn parse_form(headers: &HeaderMap, body: &Bytes) -> Params {
    if body.is_empty() {
        return Params::new();
    }

    let form_encoded = match headers.get(CONTENT_TYPE) {
        None => true,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|ct| ct.split(';').next())
            .map(|mime| mime.trim().eq_ignore_ascii_case(FORM_URLENCODED))
            .unwrap_or(false),
    };

    if !form_encoded || std::str::from_utf8(body).is_err() {
        return Params::new();
    }

    form_urlencoded::parse(body).into_owned().collect()
}
