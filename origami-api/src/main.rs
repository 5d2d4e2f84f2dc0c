//! Origami API Server Entry Point
//!
//! Loads settings, initializes the data access facade and serves the Axum
//! router until the server fails or Ctrl-C arrives.

use std::net::SocketAddr;
use std::sync::Arc;

use origami_api::telemetry::init_tracing;
use origami_api::{
    create_api_router, ApiError, ApiResult, AppState, DataAccess, LocalCatalogue,
    LocalVotingService, ServiceMode, Settings, VotingService,
};
use origami_storage::{ProductStore, VoteTally};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let settings = Settings::from_env()?;
    init_tracing(settings.log_format)?;
    let addr = settings.bind_addr()?;

    let data = Arc::new(DataAccess::initialize(&settings).await?);
    let outcome = serve(&settings, addr, Arc::clone(&data)).await;

    // Flush the store and drop the cache connection whatever `serve` returned.
    if let Err(e) = data.shutdown().await {
        tracing::error!(error = %e, "Shutdown did not complete cleanly");
    }
    outcome
}

async fn serve(settings: &Settings, addr: SocketAddr, data: Arc<DataAccess>) -> ApiResult<()> {
    let mut state = AppState::new(Arc::clone(&data));
    if settings.service_mode == ServiceMode::Voting {
        state = state.with_voting(voting_service(settings, &data).await?);
    }
    let app = create_api_router(state, settings);

    tracing::info!(
        %addr,
        backend = data.store().backend_name(),
        mode = ?settings.service_mode,
        "Starting Origami API server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            Ok(())
        }
    }
}

async fn voting_service(
    settings: &Settings,
    data: &DataAccess,
) -> ApiResult<Arc<LocalVotingService>> {
    let tally = VoteTally::load(&settings.votes_file).await?;
    tracing::info!(path = %settings.votes_file.display(), "Vote tally loaded");
    Ok(Arc::new(VotingService::new(
        LocalCatalogue(data.shared_store()),
        Arc::new(tally),
        settings.catalogue_timeout,
    )))
}
