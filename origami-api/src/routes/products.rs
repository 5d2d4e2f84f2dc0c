//! Product catalogue endpoints.
//!
//! `/api/origamis` is the name the voting front end uses for the same
//! resource; in combined mode both prefixes serve identical data.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use origami_core::{Product, ProductId};
use std::sync::Arc;

use crate::data_access::DataAccess;
use crate::error::ApiResult;
#[cfg(feature = "openapi")]
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/products - All products ordered by id
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    responses(
        (status = 200, description = "All products ordered by id", body = [Product]),
        (status = 500, description = "Storage failure", body = ApiError),
    ),
))]
pub async fn list_products(State(data): State<Arc<DataAccess>>) -> ApiResult<Json<Vec<Product>>> {
    let products = data.list_products().await?;
    tracing::debug!(count = products.len(), "Listed products");
    Ok(Json(products))
}

/// GET /api/products/{id} - One product
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 400, description = "Invalid product ID", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError),
        (status = 500, description = "Storage failure", body = ApiError),
    ),
))]
pub async fn get_product(
    State(data): State<Arc<DataAccess>>,
    Path(id): Path<ProductId>,
) -> ApiResult<Json<Product>> {
    Ok(Json(data.get_product(id).await?))
}

/// GET /api/origamis - All origamis with their votes
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/origamis",
    tag = "Origamis",
    responses(
        (status = 200, description = "All origamis ordered by id", body = [Product]),
        (status = 500, description = "Storage failure", body = ApiError),
    ),
))]
pub async fn list_origamis(state: State<Arc<DataAccess>>) -> ApiResult<Json<Vec<Product>>> {
    list_products(state).await
}

/// GET /api/origamis/{id} - One origami with its votes
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/origamis/{id}",
    tag = "Origamis",
    params(("id" = i64, Path, description = "Origami ID")),
    responses(
        (status = 200, description = "Origami found", body = Product),
        (status = 400, description = "Invalid origami ID", body = ApiError),
        (status = 404, description = "Origami not found", body = ApiError),
        (status = 500, description = "Storage failure", body = ApiError),
    ),
))]
pub async fn get_origami(
    state: State<Arc<DataAccess>>,
    id: Path<ProductId>,
) -> ApiResult<Json<Product>> {
    get_product(state, id).await
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/:id", get(get_product))
}

/// `/api/origamis` served from the facade. Voting mode mounts its own.
pub fn origami_router() -> Router<AppState> {
    Router::new()
        .route("/api/origamis", get(list_origamis))
        .route("/api/origamis/:id", get(get_origami))
}
