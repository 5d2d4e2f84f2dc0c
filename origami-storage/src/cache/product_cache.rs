//! Product projection cache.
//!
//! Wraps an optional [`CacheBackend`] and turns every failure mode into a
//! miss. Callers never see a cache error.

use super::memory::InMemoryCacheBackend;
use super::redis_backend::RedisCacheBackend;
use super::traits::{CacheBackend, CacheError};
use origami_core::{product_cache_key, Product, ProductId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Host value that selects the in-process backend instead of Redis.
pub const MEMORY_CACHE_HOST: &str = "memory";

/// Configuration for the product cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cache host; `None` leaves the cache unconfigured.
    pub host: Option<String>,
    /// Cache port.
    pub port: u16,
    /// TTL for cached entries.
    pub entry_ttl: Duration,
    /// Upper bound on every backend call, connection included.
    pub operation_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 6379,
            entry_ttl: Duration::from_secs(3600), // 1 hour
            operation_timeout: Duration::from_millis(250),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("ORIGAMI_CACHE_HOST")
                .ok()
                .filter(|h| !h.trim().is_empty()),
            port: std::env::var("ORIGAMI_CACHE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            entry_ttl: std::env::var("ORIGAMI_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.entry_ttl),
            operation_timeout: std::env::var("ORIGAMI_CACHE_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.operation_timeout),
        }
    }

    /// Set the cache host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the cache port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    /// Set the per-call timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Redis URL for the configured host, if any.
    pub fn redis_url(&self) -> Option<String> {
        self.host
            .as_ref()
            .map(|host| format!("redis://{}:{}/", host, self.port))
    }
}

/// Connection state of the cache for the lifetime of the process.
#[derive(Clone)]
pub enum CacheState {
    /// No cache host configured.
    NotConfigured,
    /// Configured but unusable (connection failed, or disconnected at shutdown).
    Disabled { reason: String },
    /// Backend ready for use.
    Connected(Arc<dyn CacheBackend>),
}

impl std::fmt::Debug for CacheState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "NotConfigured"),
            Self::Disabled { reason } => f.debug_struct("Disabled").field("reason", reason).finish(),
            Self::Connected(backend) => write!(f, "Connected({})", backend.backend_name()),
        }
    }
}

/// Best-effort product cache keyed by `product:<id>`.
pub struct ProductCache {
    state: RwLock<CacheState>,
    entry_ttl: Duration,
    operation_timeout: Duration,
}

impl ProductCache {
    /// Connect according to `config`. A failed connection is logged and the
    /// cache stays disabled; it is never retried.
    pub async fn connect(config: &CacheConfig) -> Self {
        let state = match (config.host.as_deref(), config.redis_url()) {
            (Some(MEMORY_CACHE_HOST), _) => {
                tracing::info!("Using in-process cache");
                CacheState::Connected(Arc::new(InMemoryCacheBackend::new()))
            }
            (_, Some(url)) => {
                match RedisCacheBackend::connect(&url, config.operation_timeout).await {
                    Ok(backend) => {
                        tracing::info!(url = %url, "Connected to Redis cache");
                        CacheState::Connected(Arc::new(backend))
                    }
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "Redis unavailable, caching disabled");
                        CacheState::Disabled {
                            reason: e.to_string(),
                        }
                    }
                }
            }
            (_, None) => {
                tracing::info!("No cache host configured, caching disabled");
                CacheState::NotConfigured
            }
        };
        Self::from_state(state, config)
    }

    /// A cache with no backend; every read misses.
    pub fn disabled() -> Self {
        Self::from_state(CacheState::NotConfigured, &CacheConfig::default())
    }

    /// Wrap an already-connected backend.
    pub fn with_backend(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self::from_state(CacheState::Connected(backend), config)
    }

    fn from_state(state: CacheState, config: &CacheConfig) -> Self {
        Self {
            state: RwLock::new(state),
            entry_ttl: config.entry_ttl,
            operation_timeout: config.operation_timeout,
        }
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> CacheState {
        self.state.read().await.clone()
    }

    /// Whether a cache host was configured at all.
    pub async fn is_configured(&self) -> bool {
        !matches!(*self.state.read().await, CacheState::NotConfigured)
    }

    pub fn entry_ttl(&self) -> Duration {
        self.entry_ttl
    }

    async fn backend(&self) -> Option<Arc<dyn CacheBackend>> {
        match &*self.state.read().await {
            CacheState::Connected(backend) => Some(Arc::clone(backend)),
            _ => None,
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.operation_timeout, call)
            .await
            .unwrap_or(Err(CacheError::Timeout {
                operation,
                timeout_ms: self.operation_timeout.as_millis(),
            }))
    }

    /// Cached projection for `id`. Misses, failures and timeouts are `None`.
    pub async fn get(&self, id: ProductId) -> Option<Product> {
        let backend = self.backend().await?;
        let key = product_cache_key(id);

        let raw = match self.bounded("get", backend.get(&key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(product_id = id, "Cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(product_id = id, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_str::<Product>(&raw) {
            Ok(product) => {
                tracing::debug!(product_id = id, "Cache hit");
                Some(product)
            }
            Err(e) => {
                tracing::warn!(product_id = id, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Store a projection with the configured TTL. Failures are logged.
    pub async fn set(&self, product: &Product) {
        let Some(backend) = self.backend().await else {
            return;
        };
        let raw = match serde_json::to_string(product) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(product_id = product.id, error = %e, "Failed to encode cache entry");
                return;
            }
        };
        let key = product_cache_key(product.id);
        if let Err(e) = self
            .bounded("set", backend.set_ex(&key, &raw, self.entry_ttl))
            .await
        {
            tracing::warn!(product_id = product.id, error = %e, "Cache write failed");
        }
    }

    /// Drop the entry for `id`. Failures are logged.
    pub async fn invalidate(&self, id: ProductId) {
        let Some(backend) = self.backend().await else {
            return;
        };
        let key = product_cache_key(id);
        match self.bounded("delete", backend.delete(&key)).await {
            Ok(()) => tracing::debug!(product_id = id, "Cache entry invalidated"),
            Err(e) => tracing::warn!(product_id = id, error = %e, "Cache invalidation failed"),
        }
    }

    /// `PING` succeeds. A disabled or unconfigured cache is not healthy.
    pub async fn is_healthy(&self) -> bool {
        let Some(backend) = self.backend().await else {
            return false;
        };
        match self.bounded("ping", backend.ping()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Cache health check failed");
                false
            }
        }
    }

    /// Stop using the backend for the rest of the process lifetime.
    pub async fn disconnect(&self) {
        let mut state = self.state.write().await;
        if let CacheState::Connected(backend) = &*state {
            tracing::info!(backend = backend.backend_name(), "Cache disconnected");
            *state = CacheState::Disabled {
                reason: "disconnected".to_string(),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn crane() -> Product {
        Product::new(1, "Crane", "d", "u")
    }

    /// Backend whose every call hangs past any reasonable timeout.
    struct StalledBackend;

    #[async_trait]
    impl CacheBackend for StalledBackend {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Some("{}".to_string()))
        }
        async fn set_ex(&self, _k: &str, _v: &str, _ttl: Duration) -> Result<(), CacheError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
        async fn ping(&self) -> Result<(), CacheError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
        fn backend_name(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_unconfigured_cache_always_misses() {
        let cache = ProductCache::connect(&CacheConfig::default()).await;
        assert!(!cache.is_configured().await);

        cache.set(&crane()).await;
        assert_eq!(cache.get(1).await, None);
        assert!(!cache.is_healthy().await);
    }

    #[tokio::test]
    async fn test_memory_host_selects_in_process_backend() {
        let cache = ProductCache::connect(&CacheConfig::new().with_host(MEMORY_CACHE_HOST)).await;
        assert!(matches!(cache.state().await, CacheState::Connected(_)));
        assert!(cache.is_healthy().await);
    }

    #[tokio::test]
    async fn test_unreachable_redis_disables_cache() {
        // Port 1 on loopback refuses connections.
        let config = CacheConfig::new()
            .with_host("127.0.0.1")
            .with_port(1)
            .with_operation_timeout(Duration::from_millis(200));
        let cache = ProductCache::connect(&config).await;

        assert!(matches!(cache.state().await, CacheState::Disabled { .. }));
        assert!(cache.is_configured().await);
        assert_eq!(cache.get(1).await, None);
        assert!(!cache.is_healthy().await);
    }

    #[tokio::test]
    async fn test_set_get_invalidate() {
        let cache = ProductCache::with_backend(
            Arc::new(InMemoryCacheBackend::new()),
            &CacheConfig::default(),
        );

        cache.set(&crane()).await;
        assert_eq!(cache.get(1).await, Some(crane()));

        cache.invalidate(1).await;
        assert_eq!(cache.get(1).await, None);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let backend = Arc::new(InMemoryCacheBackend::new());
        backend
            .set_ex("product:1", "not json", Duration::from_secs(60))
            .await
            .unwrap();
        let cache = ProductCache::with_backend(backend, &CacheConfig::default());

        assert_eq!(cache.get(1).await, None);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let config = CacheConfig::default().with_ttl(Duration::from_millis(30));
        let cache = ProductCache::with_backend(Arc::new(InMemoryCacheBackend::new()), &config);

        cache.set(&crane()).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(cache.get(1).await, None);
    }

    #[tokio::test]
    async fn test_stalled_backend_is_bounded_by_timeout() {
        let config = CacheConfig::default().with_operation_timeout(Duration::from_millis(50));
        let cache = ProductCache::with_backend(Arc::new(StalledBackend), &config);

        let started = tokio::time::Instant::now();
        assert_eq!(cache.get(1).await, None);
        cache.set(&crane()).await;
        cache.invalidate(1).await;
        assert!(!cache.is_healthy().await);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_disconnect_disables_cache() {
        let cache = ProductCache::with_backend(
            Arc::new(InMemoryCacheBackend::new()),
            &CacheConfig::default(),
        );
        cache.set(&crane()).await;

        cache.disconnect().await;

        assert_eq!(cache.get(1).await, None);
        assert!(matches!(cache.state().await, CacheState::Disabled { .. }));
    }
}
