//! Service Configuration Module
//!
//! Settings are loaded once at startup from environment variables with
//! defaults suitable for local development.

use origami_core::ConfigError;
use origami_storage::{CacheConfig, DbConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// STORAGE BACKEND SELECTOR
// ============================================================================

/// Which product store to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackendKind {
    #[default]
    Json,
    Postgres,
}

impl FromStr for StorageBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            _ => Err(ConfigError::InvalidValue {
                field: "ORIGAMI_STORAGE_BACKEND".to_string(),
                value: s.to_string(),
                reason: "expected json or postgres".to_string(),
            }),
        }
    }
}

/// Which routes serve `/api/origamis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceMode {
    /// Votes live on the product records, through the data access facade.
    #[default]
    Combined,
    /// Votes live in a separate tally; products come from the catalogue.
    Voting,
}

impl FromStr for ServiceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "combined" => Ok(Self::Combined),
            "voting" => Ok(Self::Voting),
            _ => Err(ConfigError::InvalidValue {
                field: "ORIGAMI_SERVICE_MODE".to_string(),
                value: s.to_string(),
                reason: "expected combined or voting".to_string(),
            }),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

// ============================================================================
// SETTINGS
// ============================================================================

/// Process-wide settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub service_mode: ServiceMode,
    pub storage_backend: StorageBackendKind,
    /// JSON store document, and the seed for a fresh Postgres table.
    pub products_file: PathBuf,
    /// Split-service vote tally document.
    pub votes_file: PathBuf,
    pub db: DbConfig,
    pub cache: CacheConfig,
    /// Bound on each call to the catalogue in the split deployment.
    pub catalogue_timeout: Duration,
    pub bind_host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,
    pub service_version: String,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_mode: ServiceMode::Combined,
            storage_backend: StorageBackendKind::Json,
            products_file: PathBuf::from("data/products.json"),
            votes_file: PathBuf::from("data/votes.json"),
            db: DbConfig::default(),
            cache: CacheConfig::default(),
            catalogue_timeout: Duration::from_secs(10),
            bind_host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_format: LogFormat::Plain,
        }
    }
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// Unparseable numeric values fall back to their defaults; an unknown
    /// storage backend or port is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let storage_backend = match std::env::var("ORIGAMI_STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.storage_backend,
        };

        let service_mode = match std::env::var("ORIGAMI_SERVICE_MODE") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.service_mode,
        };

        let port = match std::env::var("PORT").or_else(|_| std::env::var("ORIGAMI_API_PORT")) {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                field: "PORT".to_string(),
                value: value.clone(),
                reason: "expected a port number".to_string(),
            })?,
            Err(_) => defaults.port,
        };

        Ok(Self {
            service_mode,
            storage_backend,
            products_file: std::env::var("ORIGAMI_PRODUCTS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.products_file),
            votes_file: std::env::var("ORIGAMI_VOTES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.votes_file),
            db: DbConfig::from_env(),
            cache: CacheConfig::from_env(),
            catalogue_timeout: std::env::var("ORIGAMI_CATALOGUE_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.catalogue_timeout),
            bind_host: std::env::var("ORIGAMI_API_BIND").unwrap_or(defaults.bind_host),
            port,
            cors_origins: std::env::var("ORIGAMI_CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            service_version: std::env::var("ORIGAMI_SERVICE_VERSION")
                .unwrap_or(defaults.service_version),
            log_format: match std::env::var("ORIGAMI_LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    /// Settings for a JSON store at `products_file`, everything else default.
    pub fn for_json_store(products_file: impl Into<PathBuf>) -> Self {
        Self {
            products_file: products_file.into(),
            ..Self::default()
        }
    }

    /// Resolve the socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "ORIGAMI_API_BIND".to_string(),
                value: addr.clone(),
                reason: e.to_string(),
            })
    }
}
