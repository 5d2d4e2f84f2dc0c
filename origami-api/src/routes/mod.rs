//! REST API Route Handlers
//!
//! One module per resource, each exposing `create_router()`. Routers are
//! merged here and share `AppState`.

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::state::AppState;

pub mod health;
pub mod products;
pub mod system;
pub mod votes;
pub mod voting;

// ============================================================================
// OPENAPI ENDPOINTS
// ============================================================================

/// Handler for /openapi.json endpoint.
#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// ROUTER ASSEMBLY
// ============================================================================

/// Build the CORS layer. No configured origins means any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(?origins, "CORS: restricting origins");
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

/// Create the complete API router.
///
/// - Catalogue at /api/products and /api/origamis
/// - Votes at /api/origamis/{id}/votes and /api/origamis/{id}/vote, from the
///   vote tally when `state.voting` is set
/// - Health at /health
/// - Host details at /api/system-info
/// - OpenAPI spec at /openapi.json (openapi feature)
pub fn create_api_router(state: AppState, settings: &Settings) -> Router {
    let origamis = match state.voting.clone() {
        Some(service) => voting::create_router(service),
        None => products::origami_router().merge(votes::create_router()),
    };

    let router = Router::new()
        .merge(products::create_router())
        .merge(origamis)
        .merge(health::create_router())
        .merge(system::create_router());

    #[cfg(feature = "openapi")]
    let router = router.route("/openapi.json", axum::routing::get(openapi_json));

    // Each layer wraps the previous one; CORS ends up outermost.
    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&settings.cors_origins))
}
