//! Origami Test Utilities
//!
//! Centralized test infrastructure for the Origami workspace:
//! - Instrumented store and cache doubles with fault injection
//! - Proptest generators for products and ids
//! - Test fixtures for seeded stores
//! - Custom assertions for the error taxonomy

// Re-export core types for convenience
pub use origami_core::{
    OrigamiError, OrigamiResult, Product, ProductId, ProductVotes, VoteCount, VoteIncrement,
    VoteReceipt,
};
pub use origami_storage::{
    CacheBackend, CacheConfig, CacheError, InMemoryCacheBackend, JsonFileStore, ProductCache,
    ProductStore,
};

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// INSTRUMENTED STORE
// ============================================================================

/// Per-operation call counters.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub list: AtomicUsize,
    pub get: AtomicUsize,
    pub increment: AtomicUsize,
}

impl CallCounts {
    pub fn list(&self) -> usize {
        self.list.load(Ordering::SeqCst)
    }

    pub fn get(&self) -> usize {
        self.get.load(Ordering::SeqCst)
    }

    pub fn increment(&self) -> usize {
        self.increment.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.list() + self.get() + self.increment()
    }
}

/// Store wrapper that counts calls and can be told to fail.
///
/// A forced increment failure happens before the inner store is touched, so
/// the stored count is unchanged, exactly like a rolled-back write.
pub struct InstrumentedStore<S: ProductStore> {
    inner: S,
    pub calls: CallCounts,
    fail_reads: AtomicBool,
    fail_increments: AtomicBool,
    read_delay_ms: AtomicU64,
    post_read_delay_ms: AtomicU64,
}

impl<S: ProductStore> InstrumentedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: CallCounts::default(),
            fail_reads: AtomicBool::new(false),
            fail_increments: AtomicBool::new(false),
            read_delay_ms: AtomicU64::new(0),
            post_read_delay_ms: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_increments(&self, fail: bool) {
        self.fail_increments.store(fail, Ordering::SeqCst);
    }

    /// Delay every read by `delay`, to exercise caller timeouts.
    pub fn delay_reads(&self, delay: Duration) {
        self.read_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Hold every successful read for `delay` after the inner store answered,
    /// so a write can land between the read and whatever the caller does next.
    pub fn pause_after_reads(&self, delay: Duration) {
        self.post_read_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn after_read(&self) {
        let delay = self.post_read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    async fn before_read(&self, operation: &'static str) -> OrigamiResult<()> {
        let delay = self.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(OrigamiError::persistence(operation, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: ProductStore> ProductStore for InstrumentedStore<S> {
    async fn load(&self) -> OrigamiResult<()> {
        self.inner.load().await
    }

    async fn shutdown(&self) -> OrigamiResult<()> {
        self.inner.shutdown().await
    }

    async fn list_products(&self) -> OrigamiResult<Vec<Product>> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        self.before_read("list products").await?;
        self.inner.list_products().await
    }

    async fn get_product(&self, id: ProductId) -> OrigamiResult<Product> {
        self.calls.get.fetch_add(1, Ordering::SeqCst);
        self.before_read("get product").await?;
        let product = self.inner.get_product(id).await;
        self.after_read().await;
        product
    }

    async fn increment_vote(&self, id: ProductId) -> OrigamiResult<VoteIncrement> {
        self.calls.increment.fetch_add(1, Ordering::SeqCst);
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err(OrigamiError::persistence("save products", "injected failure"));
        }
        self.inner.increment_vote(id).await
    }

    async fn is_healthy(&self) -> bool {
        !self.fail_reads.load(Ordering::SeqCst) && self.inner.is_healthy().await
    }

    fn backend_name(&self) -> &'static str {
        "instrumented"
    }
}

// ============================================================================
// INSTRUMENTED CACHE BACKEND
// ============================================================================

/// Cache backend over [`InMemoryCacheBackend`] that counts calls and can be
/// made to fail or stall.
#[derive(Default)]
pub struct InstrumentedCacheBackend {
    inner: InMemoryCacheBackend,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub deletes: AtomicUsize,
    failing: AtomicBool,
    stall_ms: AtomicU64,
}

impl InstrumentedCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every call sleep for `delay` before answering.
    pub fn stall(&self, delay: Duration) {
        self.stall_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn total_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
            + self.sets.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }

    async fn gate(&self, operation: &'static str) -> Result<(), CacheError> {
        let stall = self.stall_ms.load(Ordering::SeqCst);
        if stall > 0 {
            tokio::time::sleep(Duration::from_millis(stall)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::backend(operation, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for InstrumentedCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.gate("get").await?;
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.gate("set").await?;
        self.inner.set_ex(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.gate("delete").await?;
        self.inner.delete(key).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.gate("ping").await
    }

    fn backend_name(&self) -> &'static str {
        "instrumented"
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Origami types.

    use super::*;
    use proptest::prelude::*;

    /// Ids that can name a product.
    pub fn arb_product_id() -> impl Strategy<Value = ProductId> {
        1i64..=i32::MAX as i64
    }

    /// Ids that must be rejected before any storage access.
    pub fn arb_invalid_id() -> impl Strategy<Value = ProductId> {
        prop_oneof![Just(0i64), Just(i64::MIN), i64::MIN..0i64]
    }

    pub fn arb_product_with_id(id: ProductId) -> impl Strategy<Value = Product> {
        ("[A-Z][a-z]{2,12}", ".{0,40}", "/img/[a-z]{1,8}\\.png", 0i64..10_000)
            .prop_map(move |(name, description, image_url, votes)| {
                Product::new(id, name, description, image_url).with_votes(votes)
            })
    }

    pub fn arb_product() -> impl Strategy<Value = Product> {
        arb_product_id().prop_flat_map(arb_product_with_id)
    }

    /// A catalogue with unique ids `1..=n`.
    pub fn arb_catalogue(max_len: usize) -> impl Strategy<Value = Vec<Product>> {
        (1..=max_len.max(1)).prop_flat_map(|len| {
            (1..=len as i64)
                .map(arb_product_with_id)
                .collect::<Vec<_>>()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Seed documents and ready-to-use stores.

    use super::*;
    use std::path::{Path, PathBuf};

    /// The single-product seed used throughout the vote scenarios.
    pub const CRANE_SEED: &str =
        r#"[{"id":1,"name":"Crane","description":"d","image_url":"u"}]"#;

    pub fn crane() -> Product {
        Product::new(1, "Crane", "d", "u")
    }

    pub fn sample_products() -> Vec<Product> {
        vec![
            crane(),
            Product::new(2, "Frog", "A jumping frog", "/static/frog.png").with_votes(3),
            Product::new(3, "Lily", "A water lily", "/static/lily.png").with_votes(10),
        ]
    }

    /// Write `products` as the products document under `dir`.
    pub fn write_products(dir: &Path, products: &[Product]) -> PathBuf {
        let path = dir.join("products.json");
        let bytes = serde_json::to_vec_pretty(products).expect("serialize products");
        std::fs::write(&path, bytes).expect("write products file");
        path
    }

    /// Write the raw Crane seed under `dir`.
    pub fn write_crane_seed(dir: &Path) -> PathBuf {
        let path = dir.join("products.json");
        std::fs::write(&path, CRANE_SEED).expect("write seed file");
        path
    }

    /// A loaded JSON store over `products`.
    pub async fn json_store(dir: &Path, products: &[Product]) -> JsonFileStore {
        let store = JsonFileStore::new(write_products(dir, products));
        store.load().await.expect("load json store");
        store
    }

    /// An in-memory cache with the given TTL.
    pub fn memory_cache(ttl: Duration) -> (Arc<InMemoryCacheBackend>, ProductCache) {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let cache = ProductCache::with_backend(
            Arc::clone(&backend) as Arc<dyn CacheBackend>,
            &CacheConfig::default().with_ttl(ttl),
        );
        (backend, cache)
    }

    /// Replace `dir` with a plain file so any later write beneath it fails.
    pub fn block_directory(dir: &Path) {
        std::fs::remove_dir_all(dir).expect("remove directory");
        std::fs::write(dir, b"blocked").expect("write blocker file");
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over the error taxonomy.

    use super::*;

    /// Assert that an OrigamiResult is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &OrigamiResult<T>) {
        match result {
            Err(OrigamiError::Validation { .. }) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that an OrigamiResult is NotFound for `id`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &OrigamiResult<T>, id: ProductId) {
        match result {
            Err(OrigamiError::NotFound { id: got }) => {
                assert_eq!(*got, id, "Wrong id in NotFound error");
            }
            other => panic!("Expected NotFound error for {}, got: {:?}", id, other),
        }
    }

    /// Assert that an OrigamiResult is a Persistence error.
    #[track_caller]
    pub fn assert_persistence_error<T: std::fmt::Debug>(result: &OrigamiResult<T>) {
        match result {
            Err(OrigamiError::Persistence { .. }) => {}
            other => panic!("Expected Persistence error, got: {:?}", other),
        }
    }

    /// Assert that an OrigamiResult is an UpstreamUnavailable error.
    #[track_caller]
    pub fn assert_upstream_unavailable<T: std::fmt::Debug>(result: &OrigamiResult<T>) {
        match result {
            Err(OrigamiError::UpstreamUnavailable { .. }) => {}
            other => panic!("Expected UpstreamUnavailable error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_forced_increment_failure_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = InstrumentedStore::new(
            fixtures::json_store(dir.path(), &fixtures::sample_products()).await,
        );
        store.fail_increments(true);

        assertions::assert_persistence_error(&store.increment_vote(2).await);
        assert_eq!(store.inner().get_product(2).await.unwrap().votes, 3);
        assert_eq!(store.calls.increment(), 1);
    }

    #[tokio::test]
    async fn test_failing_cache_backend_reports_errors() {
        let backend = InstrumentedCacheBackend::new();
        backend.set_failing(true);

        assert!(backend.get("product:1").await.is_err());
        assert!(backend.ping().await.is_err());
        assert_eq!(backend.total_calls(), 1);
    }

    proptest! {
        #[test]
        fn prop_catalogue_ids_are_unique_and_ordered(products in generators::arb_catalogue(8)) {
            let ids: Vec<_> = products.iter().map(|p| p.id).collect();
            let expected: Vec<_> = (1..=products.len() as i64).collect();
            prop_assert_eq!(ids, expected);
        }

        #[test]
        fn prop_invalid_ids_are_non_positive(id in generators::arb_invalid_id()) {
            prop_assert!(id <= 0);
        }
    }
}
