//! Origami Core - Entity Types
//!
//! Pure data structures shared by the storage and API crates.
//! This crate contains ONLY data types and the error taxonomy - no I/O.

use serde::{Deserialize, Serialize};

pub mod error;
pub mod health;

pub use error::{ConfigError, OrigamiError, OrigamiResult};
pub use health::{HealthReport, HealthStatus, SystemInfo};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Product identifier. Valid ids are strictly positive.
pub type ProductId = i64;

/// Vote counter value.
pub type VoteCount = i64;

/// Reject ids that can never name a product.
///
/// Runs before any storage or cache access so an invalid id never produces
/// side effects.
pub fn validate_product_id(id: ProductId) -> OrigamiResult<ProductId> {
    if id <= 0 {
        return Err(OrigamiError::Validation {
            field: "origami_id".to_string(),
            reason: format!("must be a positive integer, got {}", id),
        });
    }
    Ok(id)
}

/// Cache key for a product projection.
pub fn product_cache_key(id: ProductId) -> String {
    format!("product:{}", id)
}

// ============================================================================
// ENTITIES
// ============================================================================

/// A catalogue entry together with its authoritative vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub image_url: String,
    /// Seed documents may omit the counter; it then starts at zero.
    #[serde(default)]
    pub votes: VoteCount,
}

impl Product {
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        description: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            image_url: image_url.into(),
            votes: 0,
        }
    }

    pub fn with_votes(mut self, votes: VoteCount) -> Self {
        self.votes = votes;
        self
    }
}

/// Result of a store-level increment: the new counter and the product name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteIncrement {
    pub new_count: VoteCount,
    pub product_name: String,
}

/// Response body of a successful vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct VoteReceipt {
    pub origami_id: ProductId,
    pub new_vote_count: VoteCount,
    pub message: String,
}

impl VoteReceipt {
    pub fn new(origami_id: ProductId, increment: VoteIncrement) -> Self {
        Self {
            origami_id,
            new_vote_count: increment.new_count,
            message: format!("Vote added successfully for {}", increment.product_name),
        }
    }
}

/// Current vote count for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProductVotes {
    pub origami_id: ProductId,
    pub votes: VoteCount,
}
