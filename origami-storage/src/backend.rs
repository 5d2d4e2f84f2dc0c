//! Startup-selected storage backend.

use crate::{JsonFileStore, PostgresStore, ProductStore};
use async_trait::async_trait;
use origami_core::{OrigamiResult, Product, ProductId, VoteIncrement};

/// The product store chosen once at startup.
pub enum StoreBackend {
    Json(JsonFileStore),
    Postgres(PostgresStore),
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            StoreBackend::Json($store) => $call,
            StoreBackend::Postgres($store) => $call,
        }
    };
}

#[async_trait]
impl ProductStore for StoreBackend {
    async fn load(&self) -> OrigamiResult<()> {
        dispatch!(self, store => store.load().await)
    }

    async fn shutdown(&self) -> OrigamiResult<()> {
        dispatch!(self, store => store.shutdown().await)
    }

    async fn list_products(&self) -> OrigamiResult<Vec<Product>> {
        dispatch!(self, store => store.list_products().await)
    }

    async fn get_product(&self, id: ProductId) -> OrigamiResult<Product> {
        dispatch!(self, store => store.get_product(id).await)
    }

    async fn increment_vote(&self, id: ProductId) -> OrigamiResult<VoteIncrement> {
        dispatch!(self, store => store.increment_vote(id).await)
    }

    async fn is_healthy(&self) -> bool {
        dispatch!(self, store => store.is_healthy().await)
    }

    fn backend_name(&self) -> &'static str {
        dispatch!(self, store => store.backend_name())
    }
}

impl From<JsonFileStore> for StoreBackend {
    fn from(store: JsonFileStore) -> Self {
        Self::Json(store)
    }
}

impl From<PostgresStore> for StoreBackend {
    fn from(store: PostgresStore) -> Self {
        Self::Postgres(store)
    }
}
