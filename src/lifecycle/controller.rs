//! Lifecycle Controller.
//!
//! # Responsibilities
//! - Drive one service instance through install and activate
//! - Populate the version bucket before the instance is ever servable
//! - Claim clients before stale buckets are reclaimed
//!
//! # Design Decisions
//! - Each transition is entered through a compare-and-set on the state channel,
//!   so a second install or activate on the same instance is rejected
//! - Population and claim failures land in `Failed`; reclaim failures are logged only
//! - The bucket becomes authoritative in the same step that enters `Active`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::cache::{CacheStoreManager, ReclaimReport};
use crate::config::Configuration;
use crate::error::LifecycleError;
use crate::lifecycle::state::LifecycleState;
use crate::net::ClientRegistry;
use crate::observability::metrics;

/// State machine of one service instance.
pub struct LifecycleController {
    config: Arc<Configuration>,
    cache: Arc<CacheStoreManager>,
    clients: Arc<dyn ClientRegistry>,
    state: watch::Sender<LifecycleState>,
    skip_waiting: AtomicBool,
    served: AtomicBool,
}

impl LifecycleController {
    pub fn new(
        config: Arc<Configuration>,
        cache: Arc<CacheStoreManager>,
        clients: Arc<dyn ClientRegistry>,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Parsed);
        Self {
            config,
            cache,
            clients,
            state,
            skip_waiting: AtomicBool::new(false),
            served: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn version(&self) -> &str {
        self.config.version()
    }

    /// Whether install asked to supersede a waiting predecessor.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Whether this instance ever reached `Active`.
    ///
    /// Stays true after retirement.
    pub fn has_served(&self) -> bool {
        self.served.load(Ordering::SeqCst)
    }

    /// Install: populate the bucket of this version from the manifest.
    ///
    /// Returns the number of stored resources. On failure the instance is
    /// `Failed` and whatever instance was active stays authoritative.
    pub async fn install(&self) -> Result<usize, LifecycleError> {
        self.begin(LifecycleState::Parsed, LifecycleState::Installing, "install")?;

        if self.config.skip_waiting() {
            self.skip_waiting.store(true, Ordering::SeqCst);
            tracing::debug!(version = %self.version(), "Requested skip-waiting");
        }

        match self.cache.populate(self.version(), self.config.manifest()).await {
            Ok(count) => {
                self.enter(LifecycleState::Installed);
                Ok(count)
            }
            Err(source) => {
                tracing::error!(version = %self.version(), error = %source, "Install failed");
                self.enter(LifecycleState::Failed);
                Err(LifecycleError::Population {
                    version: self.version().to_string(),
                    source,
                })
            }
        }
    }

    /// Activate: claim every client, then reclaim stale buckets.
    pub async fn activate(&self) -> Result<ReclaimReport, LifecycleError> {
        self.begin(LifecycleState::Installed, LifecycleState::Activating, "activate")?;
        let version = self.version();

        if let Err(source) = self.clients.claim_all(version).await {
            tracing::error!(version = %version, error = %source, "Activation failed");
            self.enter(LifecycleState::Failed);
            return Err(LifecycleError::Claim {
                version: version.to_string(),
                source,
            });
        }

        let report = match self.cache.reclaim_stale(version).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(version = %version, error = %e, "Could not list buckets, skipping reclaim");
                ReclaimReport::default()
            }
        };

        self.cache.authorize(version);
        self.served.store(true, Ordering::SeqCst);
        self.enter(LifecycleState::Active);
        Ok(report)
    }

    /// Retire a superseded instance. Its bucket stops answering lookups.
    pub fn retire(&self) -> Result<(), LifecycleError> {
        let mut result = Ok(());
        self.state.send_if_modified(|current| {
            if current.can_transition_to(LifecycleState::Redundant) {
                *current = LifecycleState::Redundant;
                true
            } else {
                result = Err(LifecycleError::InvalidTransition {
                    from: *current,
                    event: "retire",
                });
                false
            }
        });
        result?;

        self.cache.revoke();
        self.log_transition(LifecycleState::Redundant);
        Ok(())
    }

    /// Move from `from` to `to`, or fail without touching the state.
    fn begin(
        &self,
        from: LifecycleState,
        to: LifecycleState,
        event: &'static str,
    ) -> Result<(), LifecycleError> {
        let mut result = Ok(());
        self.state.send_if_modified(|current| {
            if *current == from {
                *current = to;
                true
            } else {
                result = Err(LifecycleError::InvalidTransition {
                    from: *current,
                    event,
                });
                false
            }
        });
        result?;
        self.log_transition(to);
        Ok(())
    }

    fn enter(&self, next: LifecycleState) {
        self.state.send_replace(next);
        self.log_transition(next);
    }

    fn log_transition(&self, state: LifecycleState) {
        tracing::info!(version = %self.version(), state = %state, "Lifecycle transition");
        metrics::record_transition(state);
    }
}
