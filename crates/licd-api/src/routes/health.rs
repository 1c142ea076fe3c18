//! Service banner and health probes. Mounted outside the rate limiter.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

/// Response of `GET /`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    /// `memory` or `postgres`.
    pub storage: String,
    /// Whether admin endpoints are usable.
    pub admin_configured: bool,
}

/// Build the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(service_info))
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
}

/// GET /: Service banner.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is running", body = ServiceInfo)),
    tag = "health"
)]
pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "licd".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.registry.store().kind().to_string(),
        admin_configured: state.registry.admin_configured(),
    })
}

/// Liveness probe. Always 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. 503 while the database is unreachable.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.registry.store().is_ready().await {
        (StatusCode::OK, "ready")
    } else {
        tracing::warn!("readiness check failed: license store unreachable");
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    }
}
