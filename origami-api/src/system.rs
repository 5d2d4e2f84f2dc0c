//! Host environment details for `/api/system-info`.

use origami_core::SystemInfo;
use std::path::Path;

const DOCKER_MARKER: &str = "/.dockerenv";
const KUBERNETES_SERVICE_ACCOUNT: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const UNKNOWN: &str = "unknown";

/// Hostname from `HOSTNAME`, then `/etc/hostname`.
pub async fn hostname() -> Option<String> {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.trim().is_empty() {
            return Some(name.trim().to_string());
        }
    }
    tokio::fs::read_to_string("/etc/hostname")
        .await
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

async fn resolve_ip(hostname: &str) -> Option<String> {
    tokio::net::lookup_host((hostname, 0))
        .await
        .ok()?
        .next()
        .map(|addr| addr.ip().to_string())
}

/// Collect host details. Lookup failures degrade to `"unknown"`.
pub async fn collect() -> SystemInfo {
    let hostname = hostname().await;
    let ip_address = match &hostname {
        Some(name) => resolve_ip(name).await,
        None => None,
    };

    SystemInfo {
        hostname: hostname.unwrap_or_else(|| UNKNOWN.to_string()),
        ip_address: ip_address.unwrap_or_else(|| UNKNOWN.to_string()),
        is_container: Path::new(DOCKER_MARKER).exists(),
        is_kubernetes: Path::new(KUBERNETES_SERVICE_ACCOUNT).exists(),
    }
}
