//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, body limit, timeout)
//!     → request.rs (URL against the scope, query, form, captures)
//!     → session lookup → active service or passthrough
//!     → response.rs (status, end-to-end headers, body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod status;

pub use request::{Params, Request, RequestKey};
pub use response::Response;
pub use server::{AppState, HttpServer};
