//! PostgreSQL Product Store
//!
//! This module provides the relational product store using a
//! deadpool-postgres connection pool. Vote increments run in a single
//! transaction that locks the product row, so concurrent votes serialize on
//! the database.

use crate::seed::load_seed;
use crate::ProductStore;
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use origami_core::{OrigamiError, OrigamiResult, Product, ProductId, VoteIncrement};
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "origami".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("ORIGAMI_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("ORIGAMI_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("ORIGAMI_DB_NAME").unwrap_or_else(|_| "origami".to_string()),
            user: std::env::var("ORIGAMI_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("ORIGAMI_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("ORIGAMI_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("ORIGAMI_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    ///
    /// No connection is opened until the pool is first used.
    pub fn create_pool(&self) -> OrigamiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.connect_timeout = Some(self.timeout);
        let mut pool = PoolConfig::new(self.max_size);
        pool.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool);

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| OrigamiError::persistence("create pool", e))
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

const TABLE_EXISTS: &str = "SELECT EXISTS (
    SELECT 1 FROM information_schema.tables
    WHERE table_schema = current_schema() AND table_name = 'products'
)";

const CREATE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    image_url TEXT,
    votes INTEGER DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_products_id ON products(id);
";

const INSERT_PRODUCT: &str =
    "INSERT INTO products (id, name, description, image_url, votes) VALUES ($1, $2, $3, $4, $5)";

const SELECT_COLUMNS: &str = "SELECT id, name, description, image_url, votes FROM products";

/// Log a database failure and turn it into a persistence error.
fn db_error<E: Display>(operation: &'static str) -> impl FnOnce(E) -> OrigamiError {
    move |e| {
        tracing::error!(operation, error = %e, "Database error");
        OrigamiError::persistence(operation, e)
    }
}

fn row_to_product(row: &Row) -> Product {
    let id: i32 = row.get(0);
    let votes: Option<i32> = row.get(4);
    Product {
        id: i64::from(id),
        name: row.get(1),
        description: row.get::<_, Option<String>>(2).unwrap_or_default(),
        image_url: row.get::<_, Option<String>>(3).unwrap_or_default(),
        votes: i64::from(votes.unwrap_or(0)),
    }
}

fn to_db_int(field: &'static str, value: i64) -> OrigamiResult<i32> {
    i32::try_from(value).map_err(|_| {
        OrigamiError::persistence(
            "seed products",
            format!("{} = {} does not fit the products table", field, value),
        )
    })
}

// ============================================================================
// STORE
// ============================================================================

/// Product store backed by the `products` table.
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool,
    seed_path: PathBuf,
}

impl PostgresStore {
    /// Build the pool. The schema is bootstrapped by [`ProductStore::load`].
    pub fn new(config: &DbConfig, seed_path: impl Into<PathBuf>) -> OrigamiResult<Self> {
        Ok(Self {
            pool: config.create_pool()?,
            seed_path: seed_path.into(),
        })
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn client(&self) -> OrigamiResult<deadpool_postgres::Client> {
        self.pool.get().await.map_err(db_error("acquire connection"))
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn load(&self) -> OrigamiResult<()> {
        let mut client = self.client().await?;
        let tx = client
            .transaction()
            .await
            .map_err(db_error("begin bootstrap"))?;

        let exists: bool = tx
            .query_one(TABLE_EXISTS, &[])
            .await
            .map_err(db_error("check schema"))?
            .get(0);

        if exists {
            tracing::info!("Products table present, skipping seed");
        } else {
            tx.batch_execute(CREATE_SCHEMA)
                .await
                .map_err(db_error("create schema"))?;

            let products = load_seed(&self.seed_path).await?;
            let insert = tx
                .prepare(INSERT_PRODUCT)
                .await
                .map_err(db_error("prepare seed insert"))?;
            for product in &products {
                let id = to_db_int("id", product.id)?;
                let votes = to_db_int("votes", product.votes)?;
                tx.execute(
                    &insert,
                    &[
                        &id,
                        &product.name,
                        &product.description,
                        &product.image_url,
                        &votes,
                    ],
                )
                .await
                .map_err(db_error("seed products"))?;
            }
            tracing::info!(count = products.len(), "Created products table from seed");
        }

        tx.commit().await.map_err(db_error("commit bootstrap"))?;
        Ok(())
    }

    async fn shutdown(&self) -> OrigamiResult<()> {
        self.pool.close();
        tracing::info!("Database pool closed");
        Ok(())
    }

    async fn list_products(&self) -> OrigamiResult<Vec<Product>> {
        let client = self.client().await?;
        let rows = client
            .query(&format!("{} ORDER BY id", SELECT_COLUMNS), &[])
            .await
            .map_err(db_error("list products"))?;
        tracing::debug!(count = rows.len(), "Fetched products from database");
        Ok(rows.iter().map(row_to_product).collect())
    }

    async fn get_product(&self, id: ProductId) -> OrigamiResult<Product> {
        let Ok(db_id) = i32::try_from(id) else {
            return Err(OrigamiError::NotFound { id });
        };
        let client = self.client().await?;
        let row = client
            .query_opt(&format!("{} WHERE id = $1", SELECT_COLUMNS), &[&db_id])
            .await
            .map_err(db_error("get product"))?;
        row.as_ref()
            .map(row_to_product)
            .ok_or(OrigamiError::NotFound { id })
    }

    async fn increment_vote(&self, id: ProductId) -> OrigamiResult<VoteIncrement> {
        let Ok(db_id) = i32::try_from(id) else {
            return Err(OrigamiError::NotFound { id });
        };
        let mut client = self.client().await?;
        // Dropping the transaction without commit rolls it back.
        let tx = client.transaction().await.map_err(db_error("begin vote"))?;

        let row = tx
            .query_opt(
                "SELECT name, votes FROM products WHERE id = $1 FOR UPDATE",
                &[&db_id],
            )
            .await
            .map_err(db_error("lock product"))?
            .ok_or(OrigamiError::NotFound { id })?;

        let name: String = row.get(0);
        let current = row.get::<_, Option<i32>>(1).unwrap_or(0);
        let new_votes = current
            .checked_add(1)
            .ok_or_else(|| OrigamiError::persistence("add vote", "vote counter overflow"))?;

        tx.execute(
            "UPDATE products SET votes = $1 WHERE id = $2",
            &[&new_votes, &db_id],
        )
        .await
        .map_err(db_error("update votes"))?;
        tx.commit().await.map_err(db_error("commit vote"))?;

        tracing::debug!(product_id = id, from = current, to = new_votes, "Vote added");
        Ok(VoteIncrement {
            new_count: i64::from(new_votes),
            product_name: name,
        })
    }

    async fn is_healthy(&self) -> bool {
        match self.pool.get().await {
            Ok(client) => client.simple_query("SELECT 1").await.is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                false
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "origami");
        assert_eq!(config.max_size, 16);
    }

    #[tokio::test]
    async fn test_pool_creation_is_lazy() {
        // Building the store must not need a reachable server.
        let store = PostgresStore::new(&DbConfig::default(), "seed.json").unwrap();
        assert_eq!(store.backend_name(), "postgres");
        assert_eq!(store.pool().status().max_size, 16);
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        assert!(to_db_int("id", i64::from(i32::MAX) + 1).is_err());
        assert_eq!(to_db_int("id", 7).unwrap(), 7);
    }
}
