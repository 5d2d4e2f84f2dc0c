//! Health and host information types
//!
//! Shared by the data access facade (which computes health) and the HTTP
//! layer (which serializes it).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health status for the service as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Store and cache are both operational
    Healthy,
    /// Store or cache failed its health check
    Unhealthy,
}

impl HealthStatus {
    pub fn from_check(ok: bool) -> Self {
        if ok {
            Self::Healthy
        } else {
            Self::Unhealthy
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthReport {
    pub fn new(status: HealthStatus, version: impl Into<String>) -> Self {
        Self {
            status,
            timestamp: Utc::now(),
            version: version.into(),
        }
    }
}

/// Host environment details reported by `/api/system-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SystemInfo {
    pub hostname: String,
    pub ip_address: String,
    pub is_container: bool,
    pub is_kubernetes: bool,
}
