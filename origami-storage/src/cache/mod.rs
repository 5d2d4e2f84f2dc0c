//! Best-effort read-through cache for product projections.
//!
//! The cache is never authoritative: a miss, a backend failure, a timeout and
//! a disabled cache all look the same to callers (`None`), and writes and
//! invalidations are fire-and-forget. Every backend call is bounded by the
//! configured operation timeout.
//!
//! # Example
//!
//! ```ignore
//! let cache = ProductCache::connect(&CacheConfig::from_env()).await;
//! if let Some(product) = cache.get(id).await {
//!     return Ok(product);
//! }
//! let product = store.get_product(id).await?;
//! cache.set(&product).await;
//! ```

pub mod memory;
pub mod product_cache;
pub mod redis_backend;
pub mod traits;

pub use memory::InMemoryCacheBackend;
pub use product_cache::{CacheConfig, CacheState, ProductCache};
pub use redis_backend::RedisCacheBackend;
pub use traits::{CacheBackend, CacheError};
