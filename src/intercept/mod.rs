//! Interception subsystem.
//!
//! # Data Flow
//! ```text
//! Host event ──► Service entry point ──► LifecycleController (install / activate)
//!                       │
//!                       └──► InterceptionEngine (request) ──► cache / route / network
//! ```
//!
//! # Design Decisions
//! - A service owns its own cache manager; instances share only the bucket store
//! - Requests reaching an instance that is not active pass straight through

pub mod engine;
pub mod service;

pub use engine::{Intercepted, InterceptionEngine, ResponseSource};
pub use service::Service;
