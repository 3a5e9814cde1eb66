//! Error types shared across subsystems.
//!
//! Lifecycle errors are terminal to one transition attempt; request errors are
//! scoped to one request. Nothing here is ever dropped silently: callers either
//! propagate or log.

use thiserror::Error;
use tower::BoxError;

use crate::lifecycle::state::LifecycleState;

/// Errors raised by a bucket store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Bucket names are build identifiers and may not contain path separators.
    #[error("invalid bucket name: {0:?}")]
    InvalidName(String),

    /// The handle outlived its bucket.
    #[error("bucket {0} was deleted")]
    Deleted(String),

    /// Failure inside the storage engine.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors raised by the network transport.
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    /// Connectivity or protocol failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request URL cannot be mapped onto the upstream.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Manifest population failed; the bucket is not ready.
#[derive(Debug, Error)]
pub enum PopulationError {
    #[error("failed to fetch {resource}: {source}")]
    Fetch {
        resource: String,
        #[source]
        source: NetworkError,
    },

    #[error("fetching {resource} returned status {status}")]
    Status { resource: String, status: u16 },

    #[error("manifest entry {0:?} does not resolve to a URL")]
    InvalidResource(String),

    #[error("failed to store bucket {bucket}: {source}")]
    Store {
        bucket: String,
        #[source]
        source: StoreError,
    },
}

/// The client registry refused to hand over its sessions.
#[derive(Debug, Error)]
#[error("failed to claim clients: {0}")]
pub struct ClaimError(pub String);

/// One failed deletion during a stale-bucket sweep.
#[derive(Debug, Error)]
#[error("failed to delete bucket {bucket}: {source}")]
pub struct ReclaimError {
    pub bucket: String,
    #[source]
    pub source: StoreError,
}

/// A lifecycle transition attempt failed.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("install of {version} failed: {source}")]
    Population {
        version: String,
        #[source]
        source: PopulationError,
    },

    #[error("activation of {version} failed: {source}")]
    Claim {
        version: String,
        #[source]
        source: ClaimError,
    },

    #[error("cannot {event} while {from}")]
    InvalidTransition {
        from: LifecycleState,
        event: &'static str,
    },

    #[error("lifecycle task ended without reporting an outcome")]
    Abandoned,
}

/// Handling of a single intercepted request failed.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request filter failed: {0}")]
    RequestFilter(#[source] BoxError),

    #[error("route {pattern} failed: {source}")]
    Route {
        pattern: String,
        #[source]
        source: BoxError,
    },

    #[error("response filter failed: {0}")]
    ResponseFilter(#[source] BoxError),

    #[error("network fallback failed: {0}")]
    Network(#[from] NetworkError),

    #[error("request task ended without a response")]
    Abandoned,
}

impl RequestError {
    /// HTTP status a host should surface for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            RequestError::Network(_) => 502,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_status() {
        let err = RequestError::Network(NetworkError::Transport("refused".into()));
        assert_eq!(err.status_code(), 502);

        let err = RequestError::Route {
            pattern: "/api/:id".into(),
            source: "boom".into(),
        };
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "route /api/:id failed: boom");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = LifecycleError::InvalidTransition {
            from: LifecycleState::Active,
            event: "install",
        };
        assert_eq!(err.to_string(), "cannot install while active");
    }
}
