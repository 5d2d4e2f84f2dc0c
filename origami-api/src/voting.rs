//! Split-service voting.
//!
//! In the split deployment the catalogue and the vote counters live in
//! different services. [`VotingService`] joins a [`CatalogueSource`] with a
//! [`VoteTally`]; the tally's counts replace whatever the catalogue reports.
//! Every catalogue call is bounded by `catalogue_timeout`.

use async_trait::async_trait;
use origami_core::{
    validate_product_id, OrigamiError, OrigamiResult, Product, ProductId, ProductVotes,
    VoteReceipt,
};
use origami_storage::{ProductStore, StoreBackend, VoteTally};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const CATALOGUE: &str = "catalogue";

/// Where the voting service reads products from.
#[async_trait]
pub trait CatalogueSource: Send + Sync {
    /// One product, `None` when the catalogue does not know the id.
    async fn fetch_product(&self, id: ProductId) -> OrigamiResult<Option<Product>>;

    /// The whole catalogue.
    async fn fetch_all(&self) -> OrigamiResult<Vec<Product>>;
}

/// Catalogue served by an in-process [`ProductStore`].
pub struct LocalCatalogue<S: ProductStore>(pub Arc<S>);

#[async_trait]
impl<S: ProductStore> CatalogueSource for LocalCatalogue<S> {
    async fn fetch_product(&self, id: ProductId) -> OrigamiResult<Option<Product>> {
        match self.0.get_product(id).await {
            Ok(product) => Ok(Some(product)),
            Err(OrigamiError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_all(&self) -> OrigamiResult<Vec<Product>> {
        self.0.list_products().await
    }
}

/// The voting service the binary runs: catalogue from the configured store.
pub type LocalVotingService = VotingService<LocalCatalogue<StoreBackend>>;

/// Votes recorded in a local tally against products owned elsewhere.
pub struct VotingService<C: CatalogueSource> {
    catalogue: C,
    tally: Arc<VoteTally>,
    catalogue_timeout: Duration,
}

impl<C: CatalogueSource> VotingService<C> {
    pub fn new(catalogue: C, tally: Arc<VoteTally>, catalogue_timeout: Duration) -> Self {
        Self {
            catalogue,
            tally,
            catalogue_timeout,
        }
    }

    /// Run a catalogue call under the timeout. A timeout or a catalogue-side
    /// failure means the catalogue is unavailable.
    async fn ask_catalogue<T>(
        &self,
        call: impl Future<Output = OrigamiResult<T>>,
    ) -> OrigamiResult<T> {
        match tokio::time::timeout(self.catalogue_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(OrigamiError::Persistence { reason, .. })) => {
                tracing::warn!(error = %reason, "Catalogue call failed");
                Err(OrigamiError::upstream(CATALOGUE, reason))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.catalogue_timeout.as_millis() as u64,
                    "Catalogue call timed out"
                );
                Err(OrigamiError::upstream(
                    CATALOGUE,
                    format!("no answer within {:?}", self.catalogue_timeout),
                ))
            }
        }
    }

    async fn require_product(&self, id: ProductId) -> OrigamiResult<Product> {
        self.ask_catalogue(self.catalogue.fetch_product(id))
            .await?
            .ok_or(OrigamiError::NotFound { id })
    }

    /// One product with its tally count.
    pub async fn get_origami(&self, id: ProductId) -> OrigamiResult<Product> {
        let id = validate_product_id(id)?;
        let product = self.require_product(id).await?;
        let votes = self.tally.votes_for(id).await;
        Ok(product.with_votes(votes))
    }

    /// Every product with its tally count.
    pub async fn list_origamis(&self) -> OrigamiResult<Vec<Product>> {
        let products = self.ask_catalogue(self.catalogue.fetch_all()).await?;
        let votes = self.tally.all_votes().await;
        let origamis: Vec<Product> = products
            .into_iter()
            .map(|p| {
                let count = votes.get(&p.id).copied().unwrap_or(0);
                p.with_votes(count)
            })
            .collect();
        tracing::info!(count = origamis.len(), "Retrieved origamis with vote data");
        Ok(origamis)
    }

    /// Tally count for one id. The catalogue is not consulted, so an id the
    /// tally has never seen reports 0.
    pub async fn get_votes(&self, id: ProductId) -> OrigamiResult<ProductVotes> {
        let id = validate_product_id(id)?;
        Ok(ProductVotes {
            origami_id: id,
            votes: self.tally.votes_for(id).await,
        })
    }

    /// Confirm the product exists, then add one vote to the tally.
    pub async fn vote(&self, id: ProductId) -> OrigamiResult<VoteReceipt> {
        let id = validate_product_id(id)?;
        let product = self.require_product(id).await?;
        let new_vote_count = self.tally.increment(id).await?;
        Ok(VoteReceipt {
            origami_id: id,
            new_vote_count,
            message: format!("Vote recorded for {}", product.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use origami_storage::JsonFileStore;
    use origami_test_utils::{assertions::*, fixtures, InstrumentedStore};

    struct Setup {
        _dir: tempfile::TempDir,
        store: Arc<InstrumentedStore<JsonFileStore>>,
        tally: Arc<VoteTally>,
    }

    async fn setup() -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InstrumentedStore::new(
            fixtures::json_store(dir.path(), &fixtures::sample_products()).await,
        ));
        let tally = Arc::new(VoteTally::load(dir.path().join("votes.json")).await.unwrap());
        Setup {
            _dir: dir,
            store,
            tally,
        }
    }

    fn service(
        setup: &Setup,
        timeout: Duration,
    ) -> VotingService<LocalCatalogue<InstrumentedStore<JsonFileStore>>> {
        VotingService::new(
            LocalCatalogue(Arc::clone(&setup.store)),
            Arc::clone(&setup.tally),
            timeout,
        )
    }

    #[tokio::test]
    async fn test_tally_counts_replace_catalogue_counts() {
        let setup = setup().await;
        let voting = service(&setup, Duration::from_secs(1));

        // Frog carries 3 votes in the catalogue but none in the tally.
        assert_eq!(voting.get_origami(2).await.unwrap().votes, 0);

        let receipt = voting.vote(2).await.unwrap();
        assert_eq!(receipt.new_vote_count, 1);
        assert_eq!(receipt.message, "Vote recorded for Frog");
        assert_eq!(voting.get_origami(2).await.unwrap().votes, 1);

        let all = voting.list_origamis().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.iter().find(|p| p.id == 2).unwrap().votes, 1);
        assert_eq!(all.iter().find(|p| p.id == 3).unwrap().votes, 0);
    }

    #[tokio::test]
    async fn test_unknown_origami_is_not_found() {
        let setup = setup().await;
        let voting = service(&setup, Duration::from_secs(1));

        assert_not_found(&voting.get_origami(42).await, 42);
        assert_not_found(&voting.vote(42).await, 42);
        assert_eq!(setup.tally.votes_for(42).await, 0);
    }

    #[tokio::test]
    async fn test_get_votes_reads_only_the_tally() {
        let setup = setup().await;
        let voting = service(&setup, Duration::from_secs(1));

        voting.vote(1).await.unwrap();
        voting.vote(1).await.unwrap();
        let calls_before = setup.store.calls.total();

        let votes = voting.get_votes(1).await.unwrap();
        assert_eq!(votes, ProductVotes { origami_id: 1, votes: 2 });
        assert_eq!(voting.get_votes(42).await.unwrap().votes, 0);
        assert_eq!(setup.store.calls.total(), calls_before);
        assert_validation_error(&voting.get_votes(0).await);
    }

    #[tokio::test]
    async fn test_invalid_id_skips_catalogue() {
        let setup = setup().await;
        let voting = service(&setup, Duration::from_secs(1));

        assert_validation_error(&voting.vote(0).await);
        assert_validation_error(&voting.get_origami(-3).await);
        assert_eq!(setup.store.calls.total(), 0);
    }

    #[tokio::test]
    async fn test_slow_catalogue_times_out_as_upstream_unavailable() {
        let setup = setup().await;
        setup.store.delay_reads(Duration::from_millis(500));
        let voting = service(&setup, Duration::from_millis(50));

        assert_upstream_unavailable(&voting.vote(1).await);
        assert_upstream_unavailable(&voting.list_origamis().await);
        assert_eq!(setup.tally.votes_for(1).await, 0);
    }

    #[tokio::test]
    async fn test_failing_catalogue_is_upstream_unavailable() {
        let setup = setup().await;
        setup.store.fail_reads(true);
        let voting = service(&setup, Duration::from_secs(1));

        assert_upstream_unavailable(&voting.get_origami(1).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_votes_all_count() {
        let setup = setup().await;
        let voting = Arc::new(service(&setup, Duration::from_secs(5)));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let voting = Arc::clone(&voting);
                tokio::spawn(async move { voting.vote(3).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(setup.tally.votes_for(3).await, 50);
    }
}
