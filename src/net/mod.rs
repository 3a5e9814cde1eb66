//! Network-facing collaborators.
//!
//! # Data Flow
//! ```text
//! Network fallback / manifest fetch:
//!     Request
//!     → transport.rs (map onto upstream origin, strip hop-by-hop headers)
//!     → upstream response, returned verbatim
//!
//! Client sessions:
//!     first request from a client
//!     → session.rs (open session; controlled iff an instance is active)
//!     → claim_all(version) on activation takes over every open session
//! ```
//!
//! # Design Decisions
//! - Both collaborators sit behind traits so tests and hosts swap them freely
//! - Transport timeouts belong to the transport, never to the engine
//! - No retries: a failed fetch is reported to the caller as-is

pub mod session;
pub mod transport;

pub use session::{ClientRegistry, SessionId, SessionRegistry, CLIENT_ID_HEADER};
pub use transport::{HttpTransport, NetworkTransport};
