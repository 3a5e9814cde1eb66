//! Request interceptor library.
//!
//! A version-scoped request interceptor: each deployed service build
//! pre-populates a cache bucket, takes over client sessions when it
//! activates, and answers requests from its bucket, its routes, or the
//! network, in that order.

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod intercept;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::{Configuration, HostConfig};
pub use error::{LifecycleError, RequestError};
pub use http::{HttpServer, Request, Response};
pub use intercept::{InterceptionEngine, Service};
pub use lifecycle::{LifecycleController, LifecycleState, Registration, Shutdown};
