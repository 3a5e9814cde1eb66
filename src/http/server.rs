//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the intercept handler and admin endpoints
//! - Wire up middleware (tracing, request ID, timeout)
//! - Bind server to listener and drain on shutdown
//! - Hand each request to the active service, or pass it through
//!   when its session is not controlled yet

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response as AxumResponse},
    routing::get,
    Router,
};
use http_body_util::LengthLimitError;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use url::Url;

use crate::config::{ConfigError, HostConfig};
use crate::http::request::Request;
use crate::http::status;
use crate::intercept::ResponseSource;
use crate::lifecycle::{FetchEvent, Registration, Shutdown};
use crate::net::SessionId;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registration: Arc<Registration>,
    /// Scope used while no service is active.
    pub scope: Url,
    pub max_body_bytes: usize,
}

/// HTTP host of the interceptor.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &HostConfig, registration: Arc<Registration>) -> Result<Self, ConfigError> {
        let scope = Url::parse(&config.service.scope).map_err(|source| ConfigError::Url {
            url: config.service.scope.clone(),
            source,
        })?;
        let state = AppState {
            registration,
            scope,
            max_body_bytes: config.listener.max_body_bytes,
        };
        Ok(Self {
            router: Self::build_router(config, state),
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &HostConfig, state: AppState) -> Router {
        let mut router = Router::new();
        if config.admin.enabled {
            let path = format!("{}/status", config.admin.path.trim_end_matches('/'));
            router = router.route(&path, get(status::get_status));
        }

        router
            .fallback(intercept_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve until `shutdown` triggers, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(Shutdown::wait(shutdown.subscribe()))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Absolute URL of an incoming request inside `scope`.
pub fn request_url(scope: &Url, uri: &Uri) -> Url {
    let mut url = scope.clone();
    url.set_path(uri.path());
    url.set_query(uri.query());
    url
}

/// Status for a body that could not be buffered.
///
/// Only the length limit is 413; a reset or malformed stream is 400.
fn body_rejection(error: axum::Error) -> StatusCode {
    let error = error.into_inner();
    if error.downcast_ref::<LengthLimitError>().is_some() {
        StatusCode::PAYLOAD_TOO_LARGE
    } else {
        tracing::debug!(error = %error, "Failed to read request body");
        StatusCode::BAD_REQUEST
    }
}

async fn intercept_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
) -> AxumResponse {
    let start = Instant::now();
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => {
            let status = body_rejection(e);
            tracing::warn!(path = %parts.uri.path(), status = %status, "Rejected request body");
            return status.into_response();
        }
    };

    let registration = &state.registration;
    let active = registration.active();
    let scope = active
        .as_ref()
        .map(|service| service.config().scope())
        .unwrap_or(&state.scope);
    let session = SessionId::from_request(&parts.headers, peer);
    let request = Request::new(parts.method, request_url(scope, &parts.uri))
        .with_headers(parts.headers)
        .with_body(body);

    let controller = registration
        .sessions()
        .open(session.clone(), active.as_ref().map(|service| service.version()));

    match (active, controller) {
        (Some(service), Some(_)) => {
            let (event, pending) = FetchEvent::new(request);
            service.on_request(event);
            match pending.wait().await {
                Ok(response) => response.into_response(),
                Err(e) => {
                    let status = StatusCode::from_u16(e.status_code())
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                    (status, e.to_string()).into_response()
                }
            }
        }
        _ => {
            tracing::debug!(session = %session, path = %request.path(), "Uncontrolled session, passing through");
            let source = ResponseSource::Passthrough.as_str();
            match registration.transport().fetch(&request).await {
                Ok(response) => {
                    metrics::record_request(source, "ok", start);
                    response.into_response()
                }
                Err(e) => {
                    metrics::record_request(source, "error", start);
                    tracing::warn!(error = %e, "Passthrough failed");
                    (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
                }
            }
        }
    }
}
