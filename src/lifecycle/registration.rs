//! Registration: the host side of the lifecycle.
//!
//! # Responsibilities
//! - Install each deployed configuration as a new service instance
//! - Decide when an installed instance may activate
//! - Swap the active instance and retire its predecessor
//! - Expire idle sessions and activate a waiting instance once they drain
//! - Redeploy each new version reported by the config watcher
//!
//! # Design Decisions
//! - Deploys are serialized; install and activate of one instance never overlap another's
//! - An installed instance activates at once if skip-waiting was requested, nothing is
//!   active, or the active instance controls no sessions; otherwise it waits
//! - A newer installed instance replaces a waiting one, which becomes redundant
//! - A failed install or activation leaves the active instance untouched
//! - A reported version equal to the active or waiting one is not redeployed

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time;

use crate::cache::BucketStore;
use crate::config::{build_configuration, Configuration, HostConfig};
use crate::error::{LifecycleError, StoreError};
use crate::intercept::Service;
use crate::lifecycle::event::LifecycleEvent;
use crate::net::{ClientRegistry, NetworkTransport, SessionRegistry};

pub struct Registration {
    store: Arc<dyn BucketStore>,
    transport: Arc<dyn NetworkTransport>,
    sessions: Arc<SessionRegistry>,
    clients: Arc<dyn ClientRegistry>,
    active: ArcSwapOption<Service>,
    waiting: ArcSwapOption<Service>,
    deploy_lock: Mutex<()>,
}

impl Registration {
    /// Sessions are claimed through `sessions` itself.
    pub fn new(
        store: Arc<dyn BucketStore>,
        transport: Arc<dyn NetworkTransport>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        let clients: Arc<dyn ClientRegistry> = sessions.clone();
        Self::with_clients(store, transport, sessions, clients)
    }

    /// Claims go through `clients` instead of the session registry.
    pub fn with_clients(
        store: Arc<dyn BucketStore>,
        transport: Arc<dyn NetworkTransport>,
        sessions: Arc<SessionRegistry>,
        clients: Arc<dyn ClientRegistry>,
    ) -> Self {
        Self {
            store,
            transport,
            sessions,
            clients,
            active: ArcSwapOption::empty(),
            waiting: ArcSwapOption::empty(),
            deploy_lock: Mutex::new(()),
        }
    }

    pub fn active(&self) -> Option<Arc<Service>> {
        self.active.load_full()
    }

    pub fn waiting(&self) -> Option<Arc<Service>> {
        self.waiting.load_full()
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn transport(&self) -> &Arc<dyn NetworkTransport> {
        &self.transport
    }

    pub async fn bucket_names(&self) -> Result<Vec<String>, StoreError> {
        self.store.list_names().await
    }

    /// Install `config` and activate it when allowed.
    ///
    /// Returns the new instance, which is either active or waiting.
    pub async fn deploy(&self, config: Configuration) -> Result<Arc<Service>, LifecycleError> {
        let _guard = self.deploy_lock.lock().await;

        let service = Service::new(
            Arc::new(config),
            self.store.clone(),
            self.transport.clone(),
            self.clients.clone(),
        );
        tracing::info!(version = %service.version(), id = %service.id(), "Deploying service");

        let (event, pending) = LifecycleEvent::new();
        service.on_install(event);
        pending.wait().await?;

        if let Some(previous) = self.waiting.swap(None) {
            tracing::info!(version = %previous.version(), "Replacing waiting service");
            if let Err(e) = previous.retire() {
                tracing::warn!(version = %previous.version(), error = %e, "Failed to retire waiting service");
            }
        }

        if self.may_activate(&service) {
            self.promote(service.clone()).await?;
        } else {
            tracing::info!(version = %service.version(), "Service installed, waiting for sessions to drain");
            self.waiting.store(Some(service.clone()));
        }
        Ok(service)
    }

    /// Activate the waiting instance, if there is one.
    pub async fn activate_waiting(&self) -> Result<Option<Arc<Service>>, LifecycleError> {
        let _guard = self.deploy_lock.lock().await;
        match self.waiting.swap(None) {
            Some(service) => {
                self.promote(service.clone()).await?;
                Ok(Some(service))
            }
            None => Ok(None),
        }
    }

    /// Activate the waiting instance if it may activate now.
    pub async fn activate_if_drained(&self) -> Result<Option<Arc<Service>>, LifecycleError> {
        let _guard = self.deploy_lock.lock().await;
        let Some(service) = self.waiting.load_full() else {
            return Ok(None);
        };
        if !self.may_activate(&service) {
            return Ok(None);
        }

        self.waiting.store(None);
        tracing::info!(version = %service.version(), "Sessions drained, activating waiting service");
        self.promote(service.clone()).await?;
        Ok(Some(service))
    }

    /// Drop sessions idle for `idle`, then activate a waiting instance whose
    /// predecessor no longer controls any session.
    pub async fn expire_sessions(&self, idle: Duration) -> Result<Option<Arc<Service>>, LifecycleError> {
        self.sessions.expire_idle(idle);
        self.activate_if_drained().await
    }

    /// Sweep idle sessions every `every` until shutdown.
    pub async fn sweep_sessions(
        &self,
        idle: Duration,
        every: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!(idle_secs = idle.as_secs(), every_secs = every.as_secs(), "Session sweeper starting");
        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.expire_sessions(idle).await {
                        tracing::error!(error = %e, "Activating drained service failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Session sweeper stopping");
                    break;
                }
            }
        }
    }

    /// Deploy every new service version in `updates` until the channel
    /// closes or shutdown triggers.
    ///
    /// Only the service part of each update applies; listener and
    /// observability changes need a restart.
    pub async fn redeploy_on_change(
        &self,
        mut updates: mpsc::UnboundedReceiver<HostConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            let config = tokio::select! {
                update = updates.recv() => match update {
                    Some(config) => config,
                    None => break,
                },
                _ = shutdown.recv() => break,
            };

            let version = config.service.version.clone();
            if self.is_known(&version) {
                tracing::debug!(version = %version, "Service version unchanged, not redeploying");
                continue;
            }

            let service_config = match build_configuration(&config, self.transport.clone()) {
                Ok(service_config) => service_config,
                Err(e) => {
                    tracing::error!(version = %version, error = %e, "Invalid service configuration");
                    continue;
                }
            };
            match self.deploy(service_config).await {
                Ok(service) => {
                    tracing::info!(version = %service.version(), state = %service.state(), "Redeployed service")
                }
                Err(e) => tracing::error!(version = %version, error = %e, "Redeploy failed"),
            }
        }
        tracing::debug!("Redeploy loop stopped");
    }

    /// Whether `version` is the active or the waiting instance.
    fn is_known(&self, version: &str) -> bool {
        [self.active(), self.waiting()]
            .into_iter()
            .flatten()
            .any(|service| service.version() == version)
    }

    fn may_activate(&self, service: &Service) -> bool {
        if service.controller().skip_waiting_requested() {
            return true;
        }
        match self.active.load().as_ref() {
            None => true,
            Some(active) => self.sessions.controlled_by(active.version()) == 0,
        }
    }

    async fn promote(&self, service: Arc<Service>) -> Result<(), LifecycleError> {
        let (event, pending) = LifecycleEvent::new();
        service.on_activate(event);
        pending.wait().await?;

        tracing::info!(version = %service.version(), "Service active");
        if let Some(previous) = self.active.swap(Some(service)) {
            if let Err(e) = previous.retire() {
                tracing::warn!(version = %previous.version(), error = %e, "Failed to retire previous service");
            }
        }
        Ok(())
    }
}
