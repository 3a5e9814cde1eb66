//! Response snapshots and conversion to HTTP.
//!
//! # Responsibilities
//! - Hold status, ordered headers and a fully buffered body
//! - Serialize so bucket stores can snapshot responses
//! - Convert to an axum response for delivery
//!
//! # Design Decisions
//! - Header names compare case-insensitively
//! - Hop-by-hop headers and content-length are stripped on conversion
//! - Unrepresentable headers are dropped with a warning rather than failing delivery

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Headers that only apply to a single transport hop.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// A response served from a bucket, a processor or the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// `200 OK` with the given body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append_header(name, value);
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of header `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Replace every value of `name` with `value`.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status).unwrap_or_else(|_| {
            tracing::warn!(status = self.status, "Invalid status code, delivering 502");
            StatusCode::BAD_GATEWAY
        });

        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in self.headers {
            // Framing follows the buffered body, not the recorded header.
            if is_hop_by_hop(&name) || name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(header = %name, "Dropping unrepresentable header"),
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let resp = Response::ok("hi").with_header("Content-Type", "text/plain");
        assert_eq!(resp.header("content-type"), Some("text/plain"));
        assert_eq!(resp.header("x-missing"), None);
    }

    #[test]
    fn test_set_header_replaces() {
        let mut resp = Response::ok("")
            .with_header("x-tag", "a")
            .with_header("X-Tag", "b");
        resp.set_header("x-tag", "c");
        assert_eq!(resp.headers(), &[("x-tag".to_string(), "c".to_string())]);
    }

    #[test]
    fn test_into_response_strips_hop_by_hop() {
        let resp = Response::new(201, "made")
            .with_header("Connection", "keep-alive")
            .with_header("x-kept", "1");
        let http = resp.into_response();
        assert_eq!(http.status(), StatusCode::CREATED);
        assert!(http.headers().get("connection").is_none());
        assert_eq!(http.headers().get("x-kept").unwrap(), "1");
    }

    #[test]
    fn test_snapshot_serde() {
        let resp = Response::ok("body").with_header("etag", "\"v1\"");
        let json = serde_json::to_string(&resp).unwrap();
        let decoded: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, resp);
    }
}
