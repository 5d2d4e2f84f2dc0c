//! Health Check Endpoint
//!
//! `/health` reports the combined store and cache status. No authentication
//! required.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
#[cfg(feature = "openapi")]
use origami_core::HealthReport;
use std::sync::Arc;

use crate::data_access::DataAccess;
use crate::state::AppState;

/// GET /health - Store and cache health
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthReport),
        (status = 503, description = "Store or cache is down", body = HealthReport),
    ),
))]
pub async fn health(State(data): State<Arc<DataAccess>>) -> impl IntoResponse {
    let report = data.health().await;
    let status = if report.status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
