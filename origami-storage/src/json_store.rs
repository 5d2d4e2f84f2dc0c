//! JSON document product store.
//!
//! The whole catalogue lives in memory behind one `tokio::sync::Mutex` and is
//! rewritten to disk in full on every mutation. All clones of the store (via
//! `Arc`) share the same mutex, which totally orders increments.

use crate::fs::{read_optional, write_json_atomic};
use crate::seed::parse_products;
use crate::ProductStore;
use async_trait::async_trait;
use origami_core::{OrigamiError, OrigamiResult, Product, ProductId, VoteIncrement};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// File-backed store holding the catalogue as a pretty-printed JSON array.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    products: Mutex<Option<Vec<Product>>>,
    loaded: AtomicBool,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            products: Mutex::new(None),
            loaded: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, products: &[Product]) -> OrigamiResult<()> {
        write_json_atomic(&self.path, products).await.map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to save products");
            OrigamiError::persistence("save products", format!("{}: {}", self.path.display(), e))
        })?;
        tracing::debug!(path = %self.path.display(), count = products.len(), "Products saved");
        Ok(())
    }

    fn not_loaded() -> OrigamiError {
        OrigamiError::persistence("access products", "store has not been loaded")
    }
}

#[async_trait]
impl ProductStore for JsonFileStore {
    async fn load(&self) -> OrigamiResult<()> {
        let mut guard = self.products.lock().await;

        let bytes = read_optional(&self.path).await.map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to read products");
            OrigamiError::persistence("load products", format!("{}: {}", self.path.display(), e))
        })?;

        let products = match bytes {
            Some(bytes) => parse_products(&bytes, &self.path)?,
            None => {
                tracing::info!(
                    path = %self.path.display(),
                    "Products file not found, starting with empty catalogue"
                );
                self.persist(&[]).await?;
                Vec::new()
            }
        };

        tracing::info!(path = %self.path.display(), count = products.len(), "Loaded products");
        *guard = Some(products);
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    async fn shutdown(&self) -> OrigamiResult<()> {
        let guard = self.products.lock().await;
        if let Some(products) = guard.as_ref() {
            self.persist(products).await?;
        }
        Ok(())
    }

    async fn list_products(&self) -> OrigamiResult<Vec<Product>> {
        let guard = self.products.lock().await;
        let mut products = guard.as_ref().ok_or_else(Self::not_loaded)?.clone();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> OrigamiResult<Product> {
        let guard = self.products.lock().await;
        guard
            .as_ref()
            .ok_or_else(Self::not_loaded)?
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(OrigamiError::NotFound { id })
    }

    async fn increment_vote(&self, id: ProductId) -> OrigamiResult<VoteIncrement> {
        let mut guard = self.products.lock().await;
        let products = guard.as_mut().ok_or_else(Self::not_loaded)?;

        let index = products
            .iter()
            .position(|p| p.id == id)
            .ok_or(OrigamiError::NotFound { id })?;

        let previous = products[index].votes;
        products[index].votes = previous
            .checked_add(1)
            .ok_or_else(|| OrigamiError::persistence("add vote", "vote counter overflow"))?;

        if let Err(e) = self.persist(products).await {
            products[index].votes = previous;
            tracing::error!(product_id = id, votes = previous, "Vote rolled back");
            return Err(e);
        }

        let product = &products[index];
        tracing::debug!(product_id = id, from = previous, to = product.votes, "Vote added");
        Ok(VoteIncrement {
            new_count: product.votes,
            product_name: product.name.clone(),
        })
    }

    async fn is_healthy(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    fn backend_name(&self) -> &'static str {
        "json"
    }
}
