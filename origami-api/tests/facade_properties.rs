//! Property-Based Tests for the Data Access Facade
//!
//! For any catalogue on a JSON store behind a counting cache:
//! - ids the catalogue does not hold are `NotFound` and change nothing;
//! - ids `<= 0` are rejected before the store or the cache is touched;
//! - a vote followed by a read shows exactly one more vote, even when the
//!   product was cached before the vote.

use origami_api::DataAccess;
use origami_core::{OrigamiError, Product};
use origami_storage::{CacheConfig, JsonFileStore, ProductCache};
use origami_test_utils::generators::{arb_catalogue, arb_invalid_id};
use origami_test_utils::{fixtures, InstrumentedCacheBackend, InstrumentedStore};
use proptest::prelude::*;
use proptest::sample::Index;
use std::sync::Arc;
use tokio::runtime::Runtime;

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

type Store = InstrumentedStore<JsonFileStore>;

struct Harness {
    _dir: tempfile::TempDir,
    store: Arc<Store>,
    cache: Arc<InstrumentedCacheBackend>,
    data: DataAccess<Store>,
}

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

async fn harness(catalogue: &[Product]) -> Result<Harness, TestCaseError> {
    let dir = tempfile::tempdir()
        .map_err(|e| TestCaseError::fail(format!("Failed to create temp dir: {}", e)))?;
    let store = Arc::new(InstrumentedStore::new(
        fixtures::json_store(dir.path(), catalogue).await,
    ));
    let cache = Arc::new(InstrumentedCacheBackend::new());
    let data = DataAccess::from_shared(
        Arc::clone(&store),
        ProductCache::with_backend(cache.clone(), &CacheConfig::default()),
    );
    Ok(Harness {
        _dir: dir,
        store,
        cache,
        data,
    })
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_absent_ids_are_not_found_without_mutation(
        catalogue in arb_catalogue(8),
        offset in 1i64..10_000,
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let h = harness(&catalogue).await?;
            let absent = catalogue.len() as i64 + offset;

            let read = h.data.get_product(absent).await;
            prop_assert!(
                matches!(read, Err(OrigamiError::NotFound { id }) if id == absent),
                "expected NotFound for {}, got {:?}",
                absent,
                read
            );
            let vote = h.data.add_vote(absent).await;
            prop_assert!(
                matches!(vote, Err(OrigamiError::NotFound { .. })),
                "expected NotFound, got {:?}",
                vote
            );

            prop_assert_eq!(h.data.list_products().await?, catalogue.clone());
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_invalid_ids_touch_nothing(
        catalogue in arb_catalogue(4),
        id in arb_invalid_id(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let h = harness(&catalogue).await?;

            let read = h.data.get_product(id).await;
            prop_assert!(
                matches!(read, Err(OrigamiError::Validation { .. })),
                "expected Validation, got {:?}",
                read
            );
            let votes = h.data.get_votes(id).await;
            prop_assert!(
                matches!(votes, Err(OrigamiError::Validation { .. })),
                "expected Validation, got {:?}",
                votes
            );
            let vote = h.data.add_vote(id).await;
            prop_assert!(
                matches!(vote, Err(OrigamiError::Validation { .. })),
                "expected Validation, got {:?}",
                vote
            );

            prop_assert_eq!(h.store.calls.total(), 0);
            prop_assert_eq!(h.cache.total_calls(), 0);
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_vote_then_read_adds_exactly_one(
        catalogue in arb_catalogue(8),
        pick in any::<Index>(),
        warm_cache in any::<bool>(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let h = harness(&catalogue).await?;
            let target = &catalogue[pick.index(catalogue.len())];

            if warm_cache {
                prop_assert_eq!(h.data.get_product(target.id).await?.votes, target.votes);
            }

            let receipt = h.data.add_vote(target.id).await?;
            prop_assert_eq!(receipt.origami_id, target.id);
            prop_assert_eq!(receipt.new_vote_count, target.votes + 1);
            prop_assert_eq!(
                receipt.message,
                format!("Vote added successfully for {}", target.name)
            );

            prop_assert_eq!(h.data.get_product(target.id).await?.votes, target.votes + 1);
            prop_assert_eq!(h.data.get_votes(target.id).await?.votes, target.votes + 1);

            // Every other product is untouched.
            for product in h.data.list_products().await? {
                if product.id != target.id {
                    let original = catalogue.iter().find(|p| p.id == product.id);
                    prop_assert_eq!(Some(&product), original);
                }
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
