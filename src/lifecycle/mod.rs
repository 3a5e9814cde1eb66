//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Deploy (registration.rs):
//!     Configuration → Service → install event → activate event (or wait)
//!
//! Instance (controller.rs, state.rs):
//!     Parsed → Installing → Installed → Activating → Active
//!
//! Host events (event.rs):
//!     entry point → spawned task → deferred completion awaited by the host
//!
//! Process (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Shutdown broadcast → server drain, watcher stop
//! ```
//!
//! # Design Decisions
//! - Population is committed before a version is ever servable
//! - Clients are claimed before stale buckets are reclaimed
//! - Lifecycle failures end one transition attempt, never the process

pub mod controller;
pub mod event;
pub mod registration;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use controller::LifecycleController;
pub use event::{Completion, FetchEvent, LifecycleEvent, Pending};
pub use registration::Registration;
pub use shutdown::Shutdown;
pub use signals::{spawn_signal_handler, wait_for_signal};
pub use state::LifecycleState;
