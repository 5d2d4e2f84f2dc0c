//! Vote Ledger
//!
//! The increment-and-persist protocol for a single product's counter. The
//! store does the locking and rollback; the ledger validates the id before
//! anything is touched and shapes the receipt.

use crate::ProductStore;
use origami_core::{validate_product_id, OrigamiError, OrigamiResult, ProductId, VoteReceipt};
use std::sync::Arc;

/// Records votes against a [`ProductStore`].
pub struct VoteLedger<S: ProductStore> {
    store: Arc<S>,
}

impl<S: ProductStore> Clone for VoteLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ProductStore> VoteLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Add one vote to `id`.
    ///
    /// An invalid id fails before the store is consulted. An absent product
    /// fails with `NotFound` and creates no state. A persistence failure
    /// leaves the stored count at its previous value.
    pub async fn record_vote(&self, id: ProductId) -> OrigamiResult<VoteReceipt> {
        let id = validate_product_id(id)?;

        match self.store.increment_vote(id).await {
            Ok(increment) => {
                let receipt = VoteReceipt::new(id, increment);
                tracing::info!(
                    product_id = id,
                    new_vote_count = receipt.new_vote_count,
                    backend = self.store.backend_name(),
                    "Vote recorded"
                );
                Ok(receipt)
            }
            Err(e @ OrigamiError::NotFound { .. }) => {
                tracing::warn!(product_id = id, "Vote for unknown product");
                Err(e)
            }
            Err(e) => {
                tracing::error!(product_id = id, error = %e, "Vote not recorded");
                Err(e)
            }
        }
    }
}
