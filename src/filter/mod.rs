//! Request/response filter pipeline.
//!
//! # Data Flow
//! ```text
//! cache miss
//!     → pipeline.rs apply_request_filter (identity when unset)
//!     → router match + processor
//!     → pipeline.rs apply_response_filter (identity when unset)
//!     → delivered to the client
//!
//! cache hit / network fallback: pipeline not involved
//! ```
//!
//! # Design Decisions
//! - At most one filter per direction; compose inside the filter if needed
//! - Filter failures abort the request with a structured error
//! - `headers.rs` holds the header-setting filters the host config exposes

pub mod headers;
pub mod pipeline;

pub use headers::{SetRequestHeaders, SetResponseHeaders};
pub use pipeline::{
    request_filter_fn, response_filter_fn, FilterPipeline, RequestFilter, ResponseFilter,
};
