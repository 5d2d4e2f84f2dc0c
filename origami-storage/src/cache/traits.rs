//! Cache backend trait.
//!
//! This module defines the string key/value contract that cache backends
//! implement. Serialization of products happens one layer up in
//! [`ProductCache`](super::ProductCache), so backends stay object safe.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a cache backend. These never escape
/// [`ProductCache`](super::ProductCache); they are logged and swallowed there.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache connection failed: {reason}")]
    Connection { reason: String },

    #[error("Cache {operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u128,
    },

    #[error("Cache backend error during {operation}: {reason}")]
    Backend {
        operation: &'static str,
        reason: String,
    },
}

impl CacheError {
    pub fn backend(operation: &'static str, reason: impl ToString) -> Self {
        Self::Backend {
            operation,
            reason: reason.to_string(),
        }
    }
}

/// Cache backend trait for pluggable cache implementations.
///
/// Implementations must be safe for concurrent use. Keys are already
/// namespaced by the caller (`product:<id>`).
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value, `None` on miss or expiry.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value that expires after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Remove a value. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Liveness check.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
