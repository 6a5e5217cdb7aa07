//! Cart and checkout error taxonomy.

use thiserror::Error;

use sneakersku_core::{AddressId, ProductId, QuantityOverflow};

use super::store::CartStoreError;
use crate::services::catalog::CatalogError;
use crate::services::orders::OrderStoreError;

/// Errors returned by cart and checkout operations.
///
/// Validation errors describe bad input and are never retried, and neither is
/// [`CartError::Internal`]. [`CartError::StoreUnavailable`] and
/// [`CartError::Conflict`] are transient and may be retried by the caller.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product does not exist in the catalog.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The product exists but has no such variant.
    #[error("variant {variant_key} not found for product {product_id}")]
    VariantNotFound {
        product_id: ProductId,
        variant_key: String,
    },

    /// The owner has no stored cart.
    #[error("cart not found")]
    CartNotFound,

    /// The cart has no line for this product variant.
    #[error("line for product {product_id} variant {variant_key} not found in cart")]
    LineNotFound {
        product_id: ProductId,
        variant_key: String,
    },

    /// Checkout was attempted without any cart lines.
    #[error("cart is empty")]
    EmptyCart,

    /// The address does not exist or belongs to another user.
    #[error("invalid address {0}")]
    InvalidAddress(AddressId),

    /// Quantity is zero or would push the line past its limit.
    #[error("quantity out of range")]
    InvalidQuantity,

    /// The stored cart changed underneath this operation.
    #[error("cart was modified concurrently")]
    Conflict,

    /// A cache, catalog or durable store failed or timed out.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A store returned data that cannot be interpreted.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CartError {
    /// Whether retrying the whole operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Conflict)
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::VariantNotFound { .. } => "VARIANT_NOT_FOUND",
            Self::CartNotFound => "CART_NOT_FOUND",
            Self::LineNotFound { .. } => "LINE_NOT_FOUND",
            Self::EmptyCart => "EMPTY_CART",
            Self::InvalidAddress(_) => "INVALID_ADDRESS",
            Self::InvalidQuantity => "INVALID_QUANTITY",
            Self::Conflict => "CONFLICT",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<CartStoreError> for CartError {
    fn from(err: CartStoreError) -> Self {
        match err {
            CartStoreError::VersionConflict { .. } => Self::Conflict,
            CartStoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}

impl From<CatalogError> for CartError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unavailable(_) => Self::StoreUnavailable(err.to_string()),
            CatalogError::Corrupt(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<OrderStoreError> for CartError {
    fn from(err: OrderStoreError) -> Self {
        match err {
            OrderStoreError::Unavailable(_) => Self::StoreUnavailable(err.to_string()),
            OrderStoreError::Corrupt(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<QuantityOverflow> for CartError {
    fn from(_: QuantityOverflow) -> Self {
        Self::InvalidQuantity
    }
}
