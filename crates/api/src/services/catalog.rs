//! Read-only access to the product catalog.

use async_trait::async_trait;
use thiserror::Error;

use sneakersku_core::{Product, ProductId};

/// Errors raised by catalog adapters.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog backend could not be reached or failed mid-query.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    /// A stored product could not be decoded.
    #[error("catalog data corrupt: {0}")]
    Corrupt(String),
}

/// Port for looking up products while pricing cart lines.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Fetch a product with all of its variants. `Ok(None)` if it does not exist.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, CatalogError>;
}
