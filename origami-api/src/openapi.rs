//! OpenAPI Specification for the Origami API
//!
//! Generated with utoipa from the route annotations and the domain types in
//! `origami-core`. Served at `/openapi.json`.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::{health, products, system, votes};

use origami_core::{HealthReport, HealthStatus, Product, ProductVotes, SystemInfo, VoteReceipt};

/// OpenAPI document for the Origami API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Origami API",
        description = "Origami catalogue and voting service",
        license(name = "MIT"),
    ),
    paths(
        products::list_products,
        products::get_product,
        products::list_origamis,
        products::get_origami,
        votes::get_votes,
        votes::add_vote,
        health::health,
        system::system_info,
    ),
    components(schemas(
        Product,
        ProductVotes,
        VoteReceipt,
        HealthReport,
        HealthStatus,
        SystemInfo,
        ApiError,
        ErrorCode,
    )),
    tags(
        (name = "Products", description = "Catalogue browsing"),
        (name = "Origamis", description = "Catalogue browsing under the voting front end's naming"),
        (name = "Votes", description = "Vote counting"),
        (name = "Health", description = "Service health"),
        (name = "System", description = "Host details"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
