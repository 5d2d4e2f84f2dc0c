//! Voting-mode endpoints.
//!
//! Same paths and bodies as the combined `/api/origamis` routes, answered by
//! [`VotingService`](crate::voting::VotingService): products come from the
//! catalogue, counts from the vote tally.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use origami_core::{Product, ProductId, ProductVotes, VoteReceipt};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::voting::LocalVotingService;

type Voting = State<Arc<LocalVotingService>>;

pub async fn list_origamis(State(voting): Voting) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(voting.list_origamis().await?))
}

pub async fn get_origami(
    State(voting): Voting,
    Path(id): Path<ProductId>,
) -> ApiResult<Json<Product>> {
    Ok(Json(voting.get_origami(id).await?))
}

pub async fn get_votes(
    State(voting): Voting,
    Path(id): Path<ProductId>,
) -> ApiResult<Json<ProductVotes>> {
    Ok(Json(voting.get_votes(id).await?))
}

pub async fn vote(State(voting): Voting, Path(id): Path<ProductId>) -> ApiResult<Json<VoteReceipt>> {
    let receipt = voting.vote(id).await?;
    tracing::info!(origami_id = id, votes = receipt.new_vote_count, "Vote recorded in tally");
    Ok(Json(receipt))
}

pub fn create_router(voting: Arc<LocalVotingService>) -> Router<AppState> {
    Router::new()
        .route("/api/origamis", get(list_origamis))
        .route("/api/origamis/:id", get(get_origami))
        .route("/api/origamis/:id/votes", get(get_votes))
        .route("/api/origamis/:id/vote", post(vote))
        .with_state(voting)
}
