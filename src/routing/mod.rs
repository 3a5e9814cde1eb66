//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (configuration time):
//!     (pattern string, processor)[]
//!     → pattern.rs (compile into literal / capture / rest segments)
//!     → router.rs (append in declaration order)
//!     → frozen inside the immutable Configuration
//!
//! Incoming Request (cache miss, after request filter)
//!     → router.rs match_path (first matching pattern, captures)
//!     → processor.rs (produce Response)
//!     → Return: Response, route failure, or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime
//! - No regex: segment comparison only
//! - Deterministic: same path always selects the same route
//! - First match wins (declaration order)

pub mod pattern;
pub mod processor;
pub mod router;

pub use pattern::{Pattern, PatternError};
pub use processor::{processor_fn, FnProcessor, Processor, RewriteProcessor, StaticProcessor};
pub use router::{Route, RouteMatch, Router};
