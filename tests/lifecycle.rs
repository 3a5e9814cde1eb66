//! Install / activate behavior across service versions.

use std::sync::Arc;

use tower::BoxError;

use request_interceptor::cache::{BucketStore, CacheStoreManager, MemoryStore};
use request_interceptor::config::Configuration;
use request_interceptor::error::{LifecycleError, PopulationError};
use request_interceptor::http::{Request, Response};
use request_interceptor::intercept::Service;
use request_interceptor::lifecycle::{LifecycleEvent, LifecycleState, Registration};
use request_interceptor::net::{ClientRegistry, SessionId, SessionRegistry};
use request_interceptor::routing::{processor_fn, Pattern};

mod common;
use common::{url, FailingClients, FlakyStore, MockTransport};

fn echo_id_config(version: &str) -> Configuration {
    Configuration::builder(version)
        .manifest(["/a.js"])
        .route(
            Pattern::parse("/api/:id").unwrap(),
            processor_fn(|req: Request| async move {
                let id = req.params().get("id").unwrap_or_default().to_string();
                Ok::<_, BoxError>(Response::ok(format!("id={}", id)))
            }),
        )
        .build()
}

#[tokio::test]
async fn test_example_scenario() {
    let store = Arc::new(MemoryStore::new());
    store.open("v1").await.unwrap();
    let transport = MockTransport::new();
    transport.respond("/a.js", Response::ok("console.log('a')"));

    let service = Service::new(
        Arc::new(echo_id_config("v2")),
        store.clone(),
        transport.clone(),
        Arc::new(SessionRegistry::new()),
    );

    let (event, pending) = LifecycleEvent::new();
    service.on_install(event);
    pending.wait().await.unwrap();
    assert_eq!(store.list_names().await.unwrap(), vec!["v1", "v2"]);

    let (event, pending) = LifecycleEvent::new();
    service.on_activate(event);
    pending.wait().await.unwrap();
    assert_eq!(store.list_names().await.unwrap(), vec!["v2"]);
    assert_eq!(service.state(), LifecycleState::Active);

    // Change the origin; the cached bytes must still be served.
    transport.respond("/a.js", Response::ok("changed"));
    transport.clear();

    let cached = service.handle(Request::get(url("/a.js"))).await.unwrap();
    assert_eq!(cached.body().as_ref(), b"console.log('a')");

    let routed = service.handle(Request::get(url("/api/42"))).await.unwrap();
    assert_eq!(routed.body().as_ref(), b"id=42");

    let live = service.handle(Request::get(url("/unknown"))).await.unwrap();
    assert_eq!(live, transport.expected("/unknown"));

    assert_eq!(transport.seen_paths(), vec!["/unknown"]);
}

#[tokio::test]
async fn test_population_is_all_or_nothing() {
    let store = Arc::new(MemoryStore::new());
    let transport = MockTransport::new();
    transport.fail("/c.js");

    let config = Configuration::builder("v2").manifest(["/a.js", "/b.js", "/c.js"]).build();
    let service = Service::new(Arc::new(config), store.clone(), transport, Arc::new(SessionRegistry::new()));

    let err = service.install().await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Population { source: PopulationError::Fetch { .. }, .. }
    ));
    assert_eq!(service.state(), LifecycleState::Failed);
    assert!(store.list_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_store_failure_discards_new_bucket() {
    let store = FlakyStore::new();
    store.fail_writes(true);
    let config = Configuration::builder("v1").manifest(["/a.js"]).build();
    let service = Service::new(Arc::new(config), store.clone(), MockTransport::new(), Arc::new(SessionRegistry::new()));

    let err = service.install().await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Population { source: PopulationError::Store { .. }, .. }
    ));
    assert!(store.list_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_install_keeps_predecessor_authoritative() {
    let store = Arc::new(MemoryStore::new());
    let transport = MockTransport::new();
    let registration = Registration::new(store.clone(), transport.clone(), Arc::new(SessionRegistry::new()));

    registration.deploy(echo_id_config("v1")).await.unwrap();

    transport.fail("/broken.js");
    let broken = Configuration::builder("v2").manifest(["/broken.js"]).build();
    assert!(registration.deploy(broken).await.is_err());

    let active = registration.active().unwrap();
    assert_eq!(active.version(), "v1");
    assert_eq!(store.list_names().await.unwrap(), vec!["v1"]);

    transport.clear();
    active.handle(Request::get(url("/a.js"))).await.unwrap();
    assert!(transport.seen().is_empty(), "predecessor still serves from its bucket");
}

#[tokio::test]
async fn test_single_bucket_after_activation() {
    let store = Arc::new(MemoryStore::new());
    for stale in ["v0", "v1", "old-build"] {
        store.open(stale).await.unwrap();
    }
    let registration = Registration::new(store.clone(), MockTransport::new(), Arc::new(SessionRegistry::new()));

    registration.deploy(echo_id_config("v2")).await.unwrap();
    assert_eq!(store.list_names().await.unwrap(), vec!["v2"]);
}

#[tokio::test]
async fn test_reclaim_failure_does_not_block_activation() {
    let store = FlakyStore::new();
    store.inner().open("v1").await.unwrap();
    store.inner().open("v0").await.unwrap();
    store.refuse_delete("v1");

    let config = Arc::new(echo_id_config("v2"));
    let service = Service::new(config, store.clone(), MockTransport::new(), Arc::new(SessionRegistry::new()));
    service.install().await.unwrap();
    service.activate().await.unwrap();

    assert_eq!(service.state(), LifecycleState::Active);
    // v1 survives until the next successful sweep.
    assert_eq!(store.list_names().await.unwrap(), vec!["v1", "v2"]);
}

#[tokio::test]
async fn test_unlistable_store_still_activates() {
    let store = FlakyStore::new();
    let config = Arc::new(echo_id_config("v2"));
    let service = Service::new(config, store.clone(), MockTransport::new(), Arc::new(SessionRegistry::new()));
    service.install().await.unwrap();

    store.fail_listing(true);
    service.activate().await.unwrap();
    assert_eq!(service.state(), LifecycleState::Active);
}

#[tokio::test]
async fn test_claim_failure_is_fatal_and_skips_reclaim() {
    let store = Arc::new(MemoryStore::new());
    store.open("v1").await.unwrap();
    let clients: Arc<dyn ClientRegistry> = Arc::new(FailingClients);
    let service = Service::new(Arc::new(echo_id_config("v2")), store.clone(), MockTransport::new(), clients);

    service.install().await.unwrap();
    let err = service.activate().await.unwrap_err();
    assert!(matches!(err, LifecycleError::Claim { .. }));
    assert_eq!(service.state(), LifecycleState::Failed);
    assert_eq!(store.list_names().await.unwrap(), vec!["v1", "v2"]);
}

#[tokio::test]
async fn test_activation_claims_open_sessions() {
    let sessions = Arc::new(SessionRegistry::new());
    sessions.open(SessionId::new("tab-1"), None);
    sessions.open(SessionId::new("tab-2"), Some("v1"));

    let registration = Registration::new(Arc::new(MemoryStore::new()), MockTransport::new(), sessions.clone());
    registration.deploy(echo_id_config("v2")).await.unwrap();

    assert_eq!(sessions.controlled_by("v2"), 2);
    assert_eq!(sessions.controller(&SessionId::new("tab-1")).as_deref(), Some("v2"));
}

#[tokio::test]
async fn test_lookup_only_reads_authoritative_bucket() {
    let store = Arc::new(MemoryStore::new());
    let transport = MockTransport::new();
    let manager = CacheStoreManager::new(store.clone(), transport.clone(), url("/"));

    manager.populate("v1", &["/a.js".to_string()]).await.unwrap();
    let key = Request::get(url("/a.js")).key();
    assert!(manager.lookup(&key).await.is_none(), "not authoritative before activation");

    manager.authorize("v2");
    assert!(manager.lookup(&key).await.is_none(), "no fallback across versions");

    manager.authorize("v1");
    assert!(manager.lookup(&key).await.is_some());
}
