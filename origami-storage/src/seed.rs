//! Seed document parsing.
//!
//! The seed is a JSON array of `{id, name, description, image_url, votes?}`.
//! It doubles as the JSON store's on-disk format.

use origami_core::{OrigamiError, OrigamiResult, Product};
use serde_json::Value;
use std::path::Path;

/// Parse a products document. Anything other than a JSON array of products
/// is a persistence failure.
pub fn parse_products(bytes: &[u8], source: &Path) -> OrigamiResult<Vec<Product>> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| {
        tracing::error!(path = %source.display(), error = %e, "Malformed products document");
        OrigamiError::persistence("parse products", format!("{}: {}", source.display(), e))
    })?;

    if !value.is_array() {
        tracing::error!(path = %source.display(), "Products document is not a list");
        return Err(OrigamiError::persistence(
            "parse products",
            format!("{}: products document must contain a list", source.display()),
        ));
    }

    let products: Vec<Product> = serde_json::from_value(value).map_err(|e| {
        tracing::error!(path = %source.display(), error = %e, "Invalid product entry");
        OrigamiError::persistence("parse products", format!("{}: {}", source.display(), e))
    })?;

    if let Some(product) = products.iter().find(|p| p.votes < 0) {
        tracing::error!(path = %source.display(), product_id = product.id, votes = product.votes, "Negative vote count");
        return Err(OrigamiError::persistence(
            "parse products",
            format!(
                "{}: product {} has negative votes {}",
                source.display(),
                product.id,
                product.votes
            ),
        ));
    }
    Ok(products)
}

/// Read and parse a seed file that must exist.
pub async fn load_seed(path: &Path) -> OrigamiResult<Vec<Product>> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Failed to read seed document");
        OrigamiError::persistence("read seed", format!("{}: {}", path.display(), e))
    })?;
    let products = parse_products(&bytes, path)?;
    tracing::info!(path = %path.display(), count = products.len(), "Loaded seed document");
    Ok(products)
}
