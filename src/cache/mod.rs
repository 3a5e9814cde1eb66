//! Versioned response buckets.
//!
//! # Data Flow
//! ```text
//! Install:
//!     manifest entries
//!     → manager.rs (resolve against scope, fetch every entry via transport)
//!     → all fetched? → store.rs Bucket::put_all (single commit)
//!     → any failure? → nothing committed, PopulationError
//!
//! Activate:
//!     store.list_names()
//!     → delete every name != current version (best-effort sweep)
//!     → manager marks current version authoritative
//!
//! Request:
//!     RequestKey → manager.lookup → authoritative bucket only
//! ```
//!
//! # Design Decisions
//! - The storage engine is a collaborator behind `BucketStore`; `memory.rs` is
//!   the in-process adapter used by the host and tests
//! - Lookups never create buckets and never fall back across versions
//! - Store failures during lookup are logged and treated as a miss

pub mod manager;
pub mod memory;
pub mod store;

pub use manager::{CacheStoreManager, ReclaimReport};
pub use memory::MemoryStore;
pub use store::{Bucket, BucketStore};
