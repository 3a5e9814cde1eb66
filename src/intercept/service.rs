//! One deployed service instance and its host entry points.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::cache::{BucketStore, CacheStoreManager};
use crate::config::Configuration;
use crate::error::{LifecycleError, RequestError};
use crate::http::{Request, Response};
use crate::intercept::engine::{Intercepted, InterceptionEngine, ResponseSource};
use crate::lifecycle::{FetchEvent, LifecycleController, LifecycleEvent, LifecycleState};
use crate::net::{ClientRegistry, NetworkTransport};
use crate::observability::metrics;

/// A configuration bound to its controller and engine.
pub struct Service {
    id: Uuid,
    config: Arc<Configuration>,
    controller: LifecycleController,
    engine: InterceptionEngine,
    transport: Arc<dyn NetworkTransport>,
}

impl Service {
    pub fn new(
        config: Arc<Configuration>,
        store: Arc<dyn BucketStore>,
        transport: Arc<dyn NetworkTransport>,
        clients: Arc<dyn ClientRegistry>,
    ) -> Arc<Self> {
        let cache = Arc::new(CacheStoreManager::new(
            store,
            transport.clone(),
            config.scope().clone(),
        ));
        Arc::new(Self {
            id: Uuid::new_v4(),
            controller: LifecycleController::new(config.clone(), cache.clone(), clients),
            engine: InterceptionEngine::new(config.clone(), cache, transport.clone()),
            config,
            transport,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn version(&self) -> &str {
        self.config.version()
    }

    pub fn config(&self) -> &Arc<Configuration> {
        &self.config
    }

    pub fn controller(&self) -> &LifecycleController {
        &self.controller
    }

    pub fn state(&self) -> LifecycleState {
        self.controller.state()
    }

    pub async fn install(&self) -> Result<(), LifecycleError> {
        self.controller.install().await.map(|_| ())
    }

    pub async fn activate(&self) -> Result<(), LifecycleError> {
        let report = self.controller.activate().await?;
        if !report.is_clean() {
            tracing::warn!(
                version = %self.version(),
                failures = report.failures.len(),
                "Stale buckets left behind until next activation"
            );
        }
        Ok(())
    }

    pub fn retire(&self) -> Result<(), LifecycleError> {
        self.controller.retire()
    }

    /// Whether requests run through the engine.
    ///
    /// A retired instance that served keeps doing so for the requests that
    /// captured it before the swap.
    pub fn intercepting(&self) -> bool {
        match self.state() {
            LifecycleState::Active => true,
            LifecycleState::Redundant => self.controller.has_served(),
            _ => false,
        }
    }

    /// Answer one request. Before `Active` every request goes to the network.
    pub async fn handle(&self, request: Request) -> Result<Response, RequestError> {
        let start = Instant::now();
        let outcome = if self.intercepting() {
            self.engine.handle(request).await
        } else {
            self.transport
                .fetch(&request)
                .await
                .map(|response| Intercepted {
                    response,
                    source: ResponseSource::Passthrough,
                })
                .map_err(RequestError::from)
        };

        match outcome {
            Ok(intercepted) => {
                metrics::record_request(intercepted.source.as_str(), "ok", start);
                Ok(intercepted.response)
            }
            Err(e) => {
                let source = match &e {
                    RequestError::Network(_) => ResponseSource::Network,
                    _ => ResponseSource::Route,
                };
                metrics::record_request(source.as_str(), "error", start);
                tracing::warn!(version = %self.version(), error = %e, "Request failed");
                Err(e)
            }
        }
    }

    /// Host entry point for the install event.
    pub fn on_install(self: &Arc<Self>, event: LifecycleEvent) {
        let service = Arc::clone(self);
        event.wait_until(async move { service.install().await });
    }

    /// Host entry point for the activate event.
    pub fn on_activate(self: &Arc<Self>, event: LifecycleEvent) {
        let service = Arc::clone(self);
        event.wait_until(async move { service.activate().await });
    }

    /// Host entry point for a request event.
    pub fn on_request(self: &Arc<Self>, event: FetchEvent) {
        let service = Arc::clone(self);
        event.respond_with(move |request| async move { service.handle(request).await });
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("id", &self.id)
            .field("version", &self.version())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::error::NetworkError;
    use crate::net::SessionRegistry;
    use crate::routing::{Pattern, StaticProcessor};
    use async_trait::async_trait;
    use url::Url;

    struct Echo;

    #[async_trait]
    impl NetworkTransport for Echo {
        async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
            Ok(Response::ok(format!("live {}", request.path())))
        }
    }

    fn service() -> Arc<Service> {
        Service::new(
            Arc::new(Configuration::builder("v1").manifest(["/a.js"]).build()),
            Arc::new(MemoryStore::new()),
            Arc::new(Echo),
            Arc::new(SessionRegistry::new()),
        )
    }

    fn request(path: &str) -> Request {
        Request::get(Url::parse("http://localhost/").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_entry_points_drive_lifecycle() {
        let svc = service();

        let (event, pending) = LifecycleEvent::new();
        svc.on_install(event);
        pending.wait().await.unwrap();
        assert_eq!(svc.state(), LifecycleState::Installed);

        let (event, pending) = LifecycleEvent::new();
        svc.on_activate(event);
        pending.wait().await.unwrap();
        assert_eq!(svc.state(), LifecycleState::Active);

        let (event, pending) = FetchEvent::new(request("/b.js"));
        svc.on_request(event);
        assert_eq!(pending.wait().await.unwrap().body().as_ref(), b"live /b.js");
    }

    #[tokio::test]
    async fn test_passthrough_before_active() {
        let svc = service();
        let response = svc.handle(request("/a.js")).await.unwrap();
        assert_eq!(response.body().as_ref(), b"live /a.js");
        assert_eq!(svc.state(), LifecycleState::Parsed);
    }

    #[tokio::test]
    async fn test_activate_event_reports_invalid_transition() {
        let svc = service();
        let (event, pending) = LifecycleEvent::new();
        svc.on_activate(event);
        assert!(matches!(
            pending.wait().await,
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }

    fn routed(version: &str) -> Arc<Service> {
        let config = Configuration::builder(version)
            .route(Pattern::parse("/hello").unwrap(), StaticProcessor::new(Response::ok("routed")))
            .build();
        Service::new(
            Arc::new(config),
            Arc::new(MemoryStore::new()),
            Arc::new(Echo),
            Arc::new(SessionRegistry::new()),
        )
    }

    #[tokio::test]
    async fn test_retired_service_finishes_captured_requests() {
        let svc = routed("v1");
        svc.install().await.unwrap();
        svc.activate().await.unwrap();

        // A successor swapped in after this request captured `svc`.
        svc.retire().unwrap();
        assert_eq!(svc.state(), LifecycleState::Redundant);
        assert!(svc.intercepting());

        let (event, pending) = FetchEvent::new(request("/hello"));
        svc.on_request(event);
        assert_eq!(pending.wait().await.unwrap().body().as_ref(), b"routed");
    }

    #[tokio::test]
    async fn test_superseded_waiting_service_never_intercepts() {
        let svc = routed("v1");
        svc.install().await.unwrap();
        svc.retire().unwrap();

        assert!(!svc.intercepting());
        let response = svc.handle(request("/hello")).await.unwrap();
        assert_eq!(response.body().as_ref(), b"live /hello");
    }
}
