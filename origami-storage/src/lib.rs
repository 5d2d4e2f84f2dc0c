//! Origami Storage - Product Store, Cache and Vote Ledger
//!
//! Defines the storage abstraction for the product catalogue and its two
//! implementations (a JSON document on disk and a PostgreSQL table), the
//! best-effort read-through cache, and the vote increment protocol.

pub mod backend;
pub mod cache;
pub mod fs;
pub mod json_store;
pub mod ledger;
pub mod postgres;
pub mod seed;
pub mod tally;

pub use backend::StoreBackend;
pub use cache::{
    CacheBackend, CacheConfig, CacheError, CacheState, InMemoryCacheBackend, ProductCache,
    RedisCacheBackend,
};
pub use json_store::JsonFileStore;
pub use ledger::VoteLedger;
pub use postgres::{DbConfig, PostgresStore};
pub use tally::VoteTally;

use async_trait::async_trait;
use origami_core::{OrigamiResult, Product, ProductId, VoteIncrement};
use std::sync::Arc;

/// Async storage trait for the product catalogue.
///
/// Implementations own their concurrency control: `increment_vote` must be
/// safe under concurrent callers, so N concurrent increments of one id yield
/// exactly N. A failed increment leaves the stored count unchanged.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Prepare the backend (open the pool, read the document, bootstrap schema).
    async fn load(&self) -> OrigamiResult<()>;

    /// Release resources and flush pending state.
    async fn shutdown(&self) -> OrigamiResult<()>;

    /// All products ordered by id ascending.
    async fn list_products(&self) -> OrigamiResult<Vec<Product>>;

    /// Fetch one product, `NotFound` if absent.
    async fn get_product(&self, id: ProductId) -> OrigamiResult<Product>;

    /// Atomically add one vote and persist it.
    async fn increment_vote(&self, id: ProductId) -> OrigamiResult<VoteIncrement>;

    /// Liveness check.
    async fn is_healthy(&self) -> bool;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
impl<T: ProductStore + ?Sized> ProductStore for Arc<T> {
    async fn load(&self) -> OrigamiResult<()> {
        (**self).load().await
    }

    async fn shutdown(&self) -> OrigamiResult<()> {
        (**self).shutdown().await
    }

    async fn list_products(&self) -> OrigamiResult<Vec<Product>> {
        (**self).list_products().await
    }

    async fn get_product(&self, id: ProductId) -> OrigamiResult<Product> {
        (**self).get_product(id).await
    }

    async fn increment_vote(&self, id: ProductId) -> OrigamiResult<VoteIncrement> {
        (**self).increment_vote(id).await
    }

    async fn is_healthy(&self) -> bool {
        (**self).is_healthy().await
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}
