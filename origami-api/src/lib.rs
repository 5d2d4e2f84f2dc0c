//! Origami API - REST layer for the Origami catalogue and voting services
//!
//! Wires the product store, read-through cache and vote ledger from
//! `origami-storage` into one [`DataAccess`] facade and exposes it over an
//! Axum router. The split deployment's [`VotingService`] keeps its own vote
//! tally and consults a catalogue through [`CatalogueSource`].

#[macro_use]
mod macros;

pub mod config;
pub mod data_access;
pub mod error;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod state;
pub mod system;
pub mod telemetry;
pub mod voting;

// Re-export commonly used types
pub use config::{LogFormat, ServiceMode, Settings, StorageBackendKind};
pub use data_access::DataAccess;
pub use error::{ApiError, ApiResult, ErrorCode};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
pub use voting::{CatalogueSource, LocalCatalogue, LocalVotingService, VotingService};
