//! Error types for Origami operations

use crate::ProductId;
use thiserror::Error;

/// Failure kinds produced by the store, the vote ledger and the data access
/// facade. The cache never produces one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrigamiError {
    #[error("Invalid value for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Origami not found for id: {id}")]
    NotFound { id: ProductId },

    #[error("Persistence failure during {operation}: {reason}")]
    Persistence { operation: String, reason: String },

    #[error("Upstream {service} unavailable: {reason}")]
    UpstreamUnavailable { service: String, reason: String },
}

impl OrigamiError {
    pub fn persistence(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Persistence {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn upstream(service: impl Into<String>, reason: impl ToString) -> Self {
        Self::UpstreamUnavailable {
            service: service.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for Origami operations.
pub type OrigamiResult<T> = Result<T, OrigamiError>;

/// Configuration errors raised while reading settings at startup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}
