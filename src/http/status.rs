//! Admin status endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::intercept::Service;
use crate::lifecycle::LifecycleState;

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub id: String,
    pub version: String,
    pub state: LifecycleState,
    pub routes: usize,
    pub manifest: usize,
}

impl From<&Service> for ServiceStatus {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id().to_string(),
            version: service.version().to_string(),
            state: service.state(),
            routes: service.config().router().len(),
            manifest: service.config().manifest().len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub package_version: &'static str,
    pub active: Option<ServiceStatus>,
    pub waiting: Option<ServiceStatus>,
    pub buckets: Vec<String>,
    pub sessions: usize,
}

pub async fn get_status(
    State(state): State<AppState>,
) -> Result<Json<SystemStatus>, (StatusCode, String)> {
    let registration = &state.registration;
    let buckets = registration.bucket_names().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list buckets");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(SystemStatus {
        package_version: env!("CARGO_PKG_VERSION"),
        active: registration.active().as_deref().map(ServiceStatus::from),
        waiting: registration.waiting().as_deref().map(ServiceStatus::from),
        buckets,
        sessions: registration.sessions().len(),
    }))
}
