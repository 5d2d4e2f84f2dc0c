//! Vote endpoints.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use origami_core::{ProductId, ProductVotes, VoteReceipt};
use std::sync::Arc;

use crate::data_access::DataAccess;
use crate::error::ApiResult;
#[cfg(feature = "openapi")]
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/origamis/{id}/votes - Current vote count
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/origamis/{id}/votes",
    tag = "Votes",
    params(("id" = i64, Path, description = "Origami ID")),
    responses(
        (status = 200, description = "Vote count", body = ProductVotes),
        (status = 400, description = "Invalid origami ID", body = ApiError),
        (status = 404, description = "Origami not found", body = ApiError),
    ),
))]
pub async fn get_votes(
    State(data): State<Arc<DataAccess>>,
    Path(id): Path<ProductId>,
) -> ApiResult<Json<ProductVotes>> {
    Ok(Json(data.get_votes(id).await?))
}

/// POST /api/origamis/{id}/vote - Add one vote
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/origamis/{id}/vote",
    tag = "Votes",
    params(("id" = i64, Path, description = "Origami ID")),
    responses(
        (status = 200, description = "Vote recorded", body = VoteReceipt),
        (status = 400, description = "Invalid origami ID", body = ApiError),
        (status = 404, description = "Origami not found", body = ApiError),
        (status = 500, description = "Vote could not be persisted", body = ApiError),
    ),
))]
pub async fn add_vote(
    State(data): State<Arc<DataAccess>>,
    Path(id): Path<ProductId>,
) -> ApiResult<Json<VoteReceipt>> {
    Ok(Json(data.add_vote(id).await?))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/origamis/:id/votes", get(get_votes))
        .route("/api/origamis/:id/vote", post(add_vote))
}
