//! Redis cache backend.
//!
//! Uses a multiplexed `ConnectionManager`, which reconnects on its own after
//! transient failures. Cloning the manager is cheap and shares the socket.

use super::traits::{CacheBackend, CacheError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Redis-backed cache using `SETEX`/`GET`/`DEL`.
#[derive(Clone)]
pub struct RedisCacheBackend {
    conn: ConnectionManager,
}

impl RedisCacheBackend {
    /// Connect to `url` (`redis://host:port/`), giving up after `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError::Connection {
            reason: e.to_string(),
        })?;

        let conn = tokio::time::timeout(timeout, client.get_connection_manager())
            .await
            .map_err(|_| CacheError::Timeout {
                operation: "connect",
                timeout_ms: timeout.as_millis(),
            })?
            .map_err(|e| CacheError::Connection {
                reason: e.to_string(),
            })?;

        let backend = Self { conn };
        tokio::time::timeout(timeout, backend.ping())
            .await
            .map_err(|_| CacheError::Timeout {
                operation: "ping",
                timeout_ms: timeout.as_millis(),
            })??;
        Ok(backend)
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| CacheError::backend("get", e))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(key, value, seconds)
            .await
            .map_err(|e| CacheError::backend("set", e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| CacheError::backend("delete", e))?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::backend("ping", e))?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::backend("ping", format!("unexpected reply {}", pong)))
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
