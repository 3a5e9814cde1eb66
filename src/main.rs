//! Request interceptor host.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                  REQUEST INTERCEPTOR                  │
//!                      │                                                       │
//!   Client Request     │  ┌─────────┐   ┌──────────────┐   ┌───────────────┐   │
//!   ───────────────────┼─▶│  http   │──▶│   session    │──▶│ active service│   │
//!                      │  │ server  │   │   registry   │   │   (engine)    │   │
//!                      │  └─────────┘   └──────┬───────┘   └───────┬───────┘   │
//!                      │                       │ uncontrolled      │           │
//!                      │                       ▼                   ▼           │
//!                      │                ┌─────────────┐  cache → routes →      │
//!                      │                │ passthrough │  filters → network     │
//!                      │                └──────┬──────┘           │           │
//!                      │                       └─────────┬─────────┘           │
//!                      │                                 ▼                     │
//!   Client Response    │                         ┌──────────────┐              │
//!   ◀──────────────────┼─────────────────────────│  transport   │◀─────────────┼──── Origin
//!                      │                         └──────────────┘              │
//!                      │                                                       │
//!                      │  config watcher ──► Registration.deploy(new version)  │
//!                      │  session sweeper ──► activate waiting once drained    │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use url::Url;

use request_interceptor::cache::MemoryStore;
use request_interceptor::config::{build_configuration, load_config, ConfigWatcher};
use request_interceptor::http::HttpServer;
use request_interceptor::lifecycle::{spawn_signal_handler, Registration, Shutdown};
use request_interceptor::net::{HttpTransport, NetworkTransport, SessionRegistry};
use request_interceptor::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "interceptor")]
#[command(about = "Versioned request interceptor with install/activate lifecycle", long_about = None)]
struct Cli {
    /// Path of the TOML configuration file.
    #[arg(short, long, default_value = "interceptor.toml")]
    config: PathBuf,

    /// Do not redeploy when the configuration file changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "request-interceptor starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.upstream.origin,
        service_version = %config.service.version,
        routes = config.routes.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let origin = Url::parse(&config.upstream.origin)?;
    let transport: Arc<dyn NetworkTransport> = Arc::new(HttpTransport::new(
        origin,
        Duration::from_secs(config.upstream.timeout_secs),
    )?);
    let sessions = Arc::new(SessionRegistry::new());
    let registration = Arc::new(Registration::new(
        Arc::new(MemoryStore::new()),
        transport.clone(),
        sessions.clone(),
    ));

    // The first deploy must succeed; later ones may fail and keep the active service.
    let service = registration
        .deploy(build_configuration(&config, transport.clone())?)
        .await?;
    tracing::info!(version = %service.version(), state = %service.state(), "Initial service deployed");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    {
        let registration = registration.clone();
        let idle = Duration::from_secs(config.sessions.idle_timeout_secs);
        let every = Duration::from_secs(config.sessions.sweep_interval_secs);
        let shutdown = shutdown.subscribe();
        tokio::spawn(async move { registration.sweep_sessions(idle, every, shutdown).await });
    }

    let _watcher = if cli.no_watch {
        None
    } else {
        let (watcher, updates) = ConfigWatcher::new(&cli.config);
        let watcher = watcher.run()?;
        let registration = registration.clone();
        let shutdown = shutdown.subscribe();
        tokio::spawn(async move { registration.redeploy_on_change(updates, shutdown).await });
        Some(watcher)
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    HttpServer::new(&config, registration)?
        .run(listener, &shutdown)
        .await?;

    sessions.close();
    tracing::info!("Shutdown complete");
    Ok(())
}
