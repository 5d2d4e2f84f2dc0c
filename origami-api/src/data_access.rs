//! Unified Data Access Facade
//!
//! Composes the product store, the read-through cache and the vote ledger
//! behind the one contract request handlers use:
//!
//! - reads of a single product are cache-first, falling back to the store
//!   and populating the cache best-effort;
//! - listing always goes to the store;
//! - every vote invalidates the product's cache entry, whether or not the
//!   vote succeeded;
//! - store errors pass through unchanged; the cache never produces one.
//!
//! An entry may be stale for up to the cache TTL; a vote on the same product
//! always forces the next read back to the store.
//!
//! A read that raced a vote must not put its pre-vote snapshot back into the
//! cache. Each id maps onto a generation counter that votes bump after the
//! store commit; a read only keeps the entry it populated if the generation
//! it saw before reading the store is still current afterwards.

use crate::config::{Settings, StorageBackendKind};
use origami_core::{
    validate_product_id, HealthReport, HealthStatus, OrigamiResult, Product, ProductId,
    ProductVotes, VoteReceipt,
};
use origami_storage::{
    JsonFileStore, PostgresStore, ProductCache, ProductStore, StoreBackend, VoteLedger,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Number of generation counters ids are spread over. Two ids sharing a
/// counter only cost each other a skipped cache fill.
const GENERATION_STRIPES: usize = 64;

/// Data access entry point shared by all handlers.
pub struct DataAccess<S: ProductStore = StoreBackend> {
    store: Arc<S>,
    cache: ProductCache,
    ledger: VoteLedger<S>,
    generations: [AtomicU64; GENERATION_STRIPES],
    version: String,
}

impl DataAccess<StoreBackend> {
    /// Build the configured store, load it, and connect the cache.
    ///
    /// A store that fails to load aborts startup. A cache that fails to
    /// connect only disables caching.
    pub async fn initialize(settings: &Settings) -> OrigamiResult<Self> {
        let store: StoreBackend = match settings.storage_backend {
            StorageBackendKind::Json => JsonFileStore::new(&settings.products_file).into(),
            StorageBackendKind::Postgres => {
                PostgresStore::new(&settings.db, &settings.products_file)?.into()
            }
        };
        load_or_release(&store).await?;
        tracing::info!(backend = store.backend_name(), "Product store ready");

        let cache = ProductCache::connect(&settings.cache).await;
        Ok(Self::new(store, cache).with_version(settings.service_version.clone()))
    }
}

/// Load `store`; if that fails, shut it down again so a half-built store
/// (an open Postgres pool) is not left behind.
async fn load_or_release<S: ProductStore>(store: &S) -> OrigamiResult<()> {
    let Err(e) = store.load().await else {
        return Ok(());
    };
    if let Err(close) = store.shutdown().await {
        tracing::warn!(error = %close, "Cleanup after failed load also failed");
    }
    Err(e)
}

impl<S: ProductStore> DataAccess<S> {
    pub fn new(store: S, cache: ProductCache) -> Self {
        Self::from_shared(Arc::new(store), cache)
    }

    /// Build over a store the caller keeps a handle to.
    pub fn from_shared(store: Arc<S>, cache: ProductCache) -> Self {
        Self {
            ledger: VoteLedger::new(Arc::clone(&store)),
            store,
            cache,
            generations: std::array::from_fn(|_| AtomicU64::new(0)),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Set the version reported by [`DataAccess::health`].
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// A handle to the store that outlives this facade's borrow.
    pub fn shared_store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    pub fn cache(&self) -> &ProductCache {
        &self.cache
    }

    fn generation(&self, id: ProductId) -> &AtomicU64 {
        &self.generations[id.rem_euclid(GENERATION_STRIPES as i64) as usize]
    }

    /// All products ordered by id. Never served from the cache.
    pub async fn list_products(&self) -> OrigamiResult<Vec<Product>> {
        self.store.list_products().await
    }

    /// One product, cache first.
    pub async fn get_product(&self, id: ProductId) -> OrigamiResult<Product> {
        let id = validate_product_id(id)?;

        if let Some(product) = self.cache.get(id).await {
            return Ok(product);
        }

        let generation = self.generation(id);
        let seen = generation.load(Ordering::Acquire);
        let product = self.store.get_product(id).await?;

        if generation.load(Ordering::Acquire) != seen {
            tracing::debug!(product_id = id, "Vote landed during read, skipping cache fill");
            return Ok(product);
        }
        self.cache.set(&product).await;
        // A vote that committed while the entry was being written may have
        // invalidated before our write reached the cache.
        if generation.load(Ordering::Acquire) != seen {
            self.cache.invalidate(id).await;
        }
        Ok(product)
    }

    /// Vote count for one product, same read policy as [`Self::get_product`].
    pub async fn get_votes(&self, id: ProductId) -> OrigamiResult<ProductVotes> {
        let product = self.get_product(id).await?;
        Ok(ProductVotes {
            origami_id: product.id,
            votes: product.votes,
        })
    }

    /// Record a vote, then drop the cached projection.
    pub async fn add_vote(&self, id: ProductId) -> OrigamiResult<VoteReceipt> {
        let id = validate_product_id(id)?;
        let result = self.ledger.record_vote(id).await;
        self.generation(id).fetch_add(1, Ordering::AcqRel);
        self.cache.invalidate(id).await;
        result
    }

    /// Healthy when the store answers and the cache either answers or was
    /// never configured.
    pub async fn health(&self) -> HealthReport {
        let store_ok = self.store.is_healthy().await;
        let cache_ok = !self.cache.is_configured().await || self.cache.is_healthy().await;
        if !store_ok || !cache_ok {
            tracing::warn!(store_ok, cache_ok, "Health check failed");
        }
        HealthReport::new(HealthStatus::from_check(store_ok && cache_ok), &self.version)
    }

    /// Flush or close the store and stop using the cache.
    pub async fn shutdown(&self) -> OrigamiResult<()> {
        let result = self.store.shutdown().await;
        self.cache.disconnect().await;
        match &result {
            Ok(()) => tracing::info!(backend = self.store.backend_name(), "Data access shut down"),
            Err(e) => tracing::error!(error = %e, "Store shutdown failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use origami_core::OrigamiError;
    use origami_test_utils::{assertions::*, fixtures, InstrumentedCacheBackend, InstrumentedStore};
    use origami_storage::CacheConfig;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    type Store = InstrumentedStore<JsonFileStore>;

    async fn setup(
        dir: &std::path::Path,
    ) -> (Arc<Store>, Arc<InstrumentedCacheBackend>, DataAccess<Store>) {
        let store = Arc::new(InstrumentedStore::new(
            fixtures::json_store(dir, &fixtures::sample_products()).await,
        ));
        let backend = Arc::new(InstrumentedCacheBackend::new());
        let cache = ProductCache::with_backend(backend.clone(), &CacheConfig::default());
        let data = DataAccess::from_shared(Arc::clone(&store), cache);
        (store, backend, data)
    }

    #[tokio::test]
    async fn test_crane_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixtures::write_crane_seed(dir.path());
        let data = DataAccess::initialize(&Settings::for_json_store(path))
            .await
            .unwrap();

        assert_eq!(data.get_product(1).await.unwrap().votes, 0);
        let receipt = data.add_vote(1).await.unwrap();
        assert_eq!(receipt.origami_id, 1);
        assert_eq!(receipt.new_vote_count, 1);
        assert_eq!(receipt.message, "Vote added successfully for Crane");
        assert_eq!(data.get_votes(1).await.unwrap().votes, 1);
    }

    #[tokio::test]
    async fn test_absent_products_file_self_heals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("products.json");
        let data = DataAccess::initialize(&Settings::for_json_store(&path))
            .await
            .unwrap();

        assert!(data.list_products().await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (store, backend, data) = setup(dir.path()).await;

        let first = data.get_product(2).await.unwrap();
        let second = data.get_product(2).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.calls.get(), 1);
        assert_eq!(backend.sets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_stable_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _backend, data) = setup(dir.path()).await;

        let before = data.get_product(2).await.unwrap();
        // Change the store underneath the facade.
        store.inner().increment_vote(2).await.unwrap();

        assert_eq!(data.get_product(2).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_vote_invalidates_cached_entry() {
        let dir = tempfile::tempdir().unwrap();
        let (_store, _backend, data) = setup(dir.path()).await;

        let before = data.get_product(3).await.unwrap().votes;
        data.add_vote(3).await.unwrap();

        assert_eq!(data.get_product(3).await.unwrap().votes, before + 1);
    }

    #[tokio::test]
    async fn test_read_racing_a_vote_does_not_cache_pre_vote_count() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _backend, data) = setup(dir.path()).await;
        let data = Arc::new(data);

        store.pause_after_reads(Duration::from_millis(150));
        let reader = {
            let data = Arc::clone(&data);
            tokio::spawn(async move { data.get_product(2).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let receipt = data.add_vote(2).await.unwrap();
        assert_eq!(receipt.new_vote_count, 4);
        // The slow read saw the store before the vote.
        assert_eq!(reader.await.unwrap().unwrap().votes, 3);

        store.pause_after_reads(Duration::ZERO);
        assert_eq!(data.get_product(2).await.unwrap().votes, 4);
        assert_eq!(data.get_votes(2).await.unwrap().votes, 4);
    }

    /// Store whose `load` always fails; counts shutdowns.
    #[derive(Default)]
    struct BrokenLoad {
        shutdowns: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ProductStore for BrokenLoad {
        async fn load(&self) -> OrigamiResult<()> {
            Err(OrigamiError::persistence("load products", "connection refused"))
        }

        async fn shutdown(&self) -> OrigamiResult<()> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn list_products(&self) -> OrigamiResult<Vec<Product>> {
            Err(OrigamiError::persistence("list products", "not loaded"))
        }

        async fn get_product(&self, id: ProductId) -> OrigamiResult<Product> {
            Err(OrigamiError::NotFound { id })
        }

        async fn increment_vote(
            &self,
            id: ProductId,
        ) -> OrigamiResult<origami_core::VoteIncrement> {
            Err(OrigamiError::NotFound { id })
        }

        async fn is_healthy(&self) -> bool {
            false
        }

        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_failed_load_releases_store() {
        let store = BrokenLoad::default();
        assert_persistence_error(&load_or_release(&store).await);
        assert_eq!(store.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initialize_fails_on_bad_products_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        std::fs::write(&path, r#"{"not": "a list"}"#).unwrap();

        let result = DataAccess::initialize(&Settings::for_json_store(&path)).await;
        assert!(matches!(result, Err(OrigamiError::Persistence { .. })));
    }

    #[tokio::test]
    async fn test_list_bypasses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (store, backend, data) = setup(dir.path()).await;

        data.list_products().await.unwrap();
        data.list_products().await.unwrap();

        assert_eq!(store.calls.list(), 2);
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_ids_touch_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (store, backend, data) = setup(dir.path()).await;

        for id in [0, -1, -42] {
            assert_validation_error(&data.get_product(id).await);
            assert_validation_error(&data.get_votes(id).await);
            assert_validation_error(&data.add_vote(id).await);
        }

        assert_eq!(store.calls.total(), 0);
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_absent_id_is_not_found_without_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let (_store, _backend, data) = setup(dir.path()).await;
        let before = data.list_products().await.unwrap();

        assert_not_found(&data.get_product(99).await, 99);
        assert_not_found(&data.add_vote(99).await, 99);

        assert_eq!(data.list_products().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_failed_vote_keeps_count_and_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let (store, backend, data) = setup(dir.path()).await;
        data.get_product(2).await.unwrap();
        store.fail_increments(true);

        assert_persistence_error(&data.add_vote(2).await);

        assert_eq!(backend.deletes.load(Ordering::SeqCst), 1);
        store.fail_increments(false);
        assert_eq!(data.get_product(2).await.unwrap().votes, 3);
    }

    #[tokio::test]
    async fn test_real_persist_failure_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        let store = fixtures::json_store(&data_dir, &fixtures::sample_products()).await;
        let data = DataAccess::new(store, ProductCache::disabled());

        fixtures::block_directory(&data_dir);

        assert_persistence_error(&data.add_vote(1).await);
        assert_eq!(data.get_product(1).await.unwrap().votes, 0);
    }

    #[tokio::test]
    async fn test_cache_failures_fall_back_to_store() {
        let dir = tempfile::tempdir().unwrap();
        let (store, backend, data) = setup(dir.path()).await;
        backend.set_failing(true);

        assert_eq!(data.get_product(1).await.unwrap().name, "Crane");
        data.add_vote(1).await.unwrap();
        assert_eq!(data.get_product(1).await.unwrap().votes, 1);
        assert_eq!(store.calls.get(), 2);
    }

    #[tokio::test]
    async fn test_stalled_cache_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let store = fixtures::json_store(dir.path(), &fixtures::sample_products()).await;
        let backend = Arc::new(InstrumentedCacheBackend::new());
        backend.stall(Duration::from_secs(5));
        let config = CacheConfig::default().with_operation_timeout(Duration::from_millis(50));
        let data = DataAccess::new(store, ProductCache::with_backend(backend, &config));

        let started = tokio::time::Instant::now();
        assert_eq!(data.get_product(1).await.unwrap().id, 1);
        data.add_vote(1).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_votes_all_count() {
        let dir = tempfile::tempdir().unwrap();
        let (_store, _backend, data) = setup(dir.path()).await;
        let data = Arc::new(data);

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let data = Arc::clone(&data);
                tokio::spawn(async move { data.add_vote(2).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(data.get_product(2).await.unwrap().votes, 53);
    }

    #[tokio::test]
    async fn test_health_reflects_components() {
        let dir = tempfile::tempdir().unwrap();
        let (store, backend, data) = setup(dir.path()).await;
        let data = data.with_version("9.9.9");

        let report = data.health().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.version, "9.9.9");

        backend.set_failing(true);
        assert_eq!(data.health().await.status, HealthStatus::Unhealthy);

        backend.set_failing(false);
        store.fail_reads(true);
        assert_eq!(data.health().await.status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_unconfigured_cache_does_not_fail_health() {
        let dir = tempfile::tempdir().unwrap();
        let store = fixtures::json_store(dir.path(), &fixtures::sample_products()).await;
        let data = DataAccess::new(store, ProductCache::disabled());

        assert_eq!(data.health().await.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_and_disconnects() {
        let dir = tempfile::tempdir().unwrap();
        let (store, backend, data) = setup(dir.path()).await;
        std::fs::remove_file(store.inner().path()).unwrap();

        data.shutdown().await.unwrap();

        assert!(store.inner().path().exists());
        data.get_product(1).await.unwrap();
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_store_errors_pass_through_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _backend, data) = setup(dir.path()).await;
        store.fail_reads(true);

        assert_eq!(
            data.list_products().await.unwrap_err(),
            OrigamiError::persistence("list products", "injected failure")
        );
    }
}
