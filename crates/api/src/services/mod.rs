//! Business logic services.
//!
//! Services depend on ports (`CartStore`, `CatalogReader`, `OrderStore`,
//! `AuthGate`) rather than concrete backends; the `db` module and the `moka`
//! cart store provide the production adapters.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod retry;

use std::future::Future;
use std::time::Duration;

pub use auth::{AuthError, AuthGate, Identity};
pub use cart::{CartError, CartService, CartStore, CartStoreError, MokaCartStore, OwnerLocks};
pub use catalog::{CatalogError, CatalogReader};
pub use checkout::CheckoutService;
pub use orders::{OrderStore, OrderStoreError};
pub use retry::RetryPolicy;

/// Bound a collaborator call by `limit`. Elapsing is `StoreUnavailable`.
pub(crate) async fn with_timeout<T, E, F>(
    limit: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, CartError>
where
    F: Future<Output = Result<T, E>>,
    CartError: From<E>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(CartError::from),
        Err(_) => {
            tracing::warn!(operation, timeout = ?limit, "Store call timed out");
            Err(CartError::StoreUnavailable(format!("{operation} timed out")))
        }
    }
}
