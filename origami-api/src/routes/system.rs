//! System information endpoint.

use axum::{routing::get, Json, Router};
use origami_core::SystemInfo;

use crate::state::AppState;
use crate::system;

/// GET /api/system-info - Host details
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/system-info",
    tag = "System",
    responses(
        (status = 200, description = "Host details", body = SystemInfo),
    ),
))]
pub async fn system_info() -> Json<SystemInfo> {
    Json(system::collect().await)
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/api/system-info", get(system_info))
}
