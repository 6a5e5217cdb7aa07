//! Cart service.
//!
//! Owns the cart lifecycle: lazy creation on first add, line mutation with
//! snapshot pricing, and deletion. Every read-modify-write runs under the
//! owner's lock and ends in a version-checked write, so concurrent requests
//! for one owner never lose each other's updates.
//!
//! The service does not retry. Transient failures come back as
//! [`CartError::StoreUnavailable`] or [`CartError::Conflict`] and the calling
//! boundary decides whether to try again.

mod error;
mod locks;
mod store;

pub use error::CartError;
pub use locks::OwnerLocks;
pub use store::{CartStore, CartStoreError, MokaCartStore};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tracing::instrument;

use sneakersku_core::{Cart, NewCartLine, ProductId, UserId};

use super::catalog::CatalogReader;
use super::with_timeout;

/// Cart operations for authenticated owners.
///
/// Cheap to clone; clones share the store, catalog and lock table.
#[derive(Clone)]
pub struct CartService {
    inner: Arc<CartServiceInner>,
}

struct CartServiceInner {
    store: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogReader>,
    locks: OwnerLocks,
    io_timeout: Duration,
}

impl CartService {
    /// Create a cart service.
    ///
    /// # Arguments
    ///
    /// * `store` - Cache holding one cart per owner
    /// * `catalog` - Source of product prices
    /// * `locks` - Per-owner lock table, shared with checkout
    /// * `io_timeout` - Upper bound for every store and catalog call
    #[must_use]
    pub fn new(
        store: Arc<dyn CartStore>,
        catalog: Arc<dyn CatalogReader>,
        locks: OwnerLocks,
        io_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CartServiceInner {
                store,
                catalog,
                locks,
                io_timeout,
            }),
        }
    }

    /// Get the owner's cart, or a fresh empty one if none is stored.
    ///
    /// The empty cart is not persisted.
    ///
    /// # Errors
    ///
    /// Returns `CartError::StoreUnavailable` if the cart store fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, owner: &UserId) -> Result<Cart, CartError> {
        let _guard = self.lock(owner).await;
        Ok(self
            .load(owner)
            .await?
            .unwrap_or_else(|| Cart::new(owner.clone(), Utc::now())))
    }

    /// Add units of a product variant, creating the cart if needed.
    ///
    /// The unit price is `base_price + price_adjustment` at the time of the
    /// call. Adding to an existing line only increases its quantity.
    ///
    /// # Errors
    ///
    /// - `CartError::InvalidQuantity` if `quantity` is zero or the line would
    ///   exceed `u32::MAX` units
    /// - `CartError::ProductNotFound` / `CartError::VariantNotFound` for unknown items
    /// - `CartError::Conflict` if the stored cart changed during the write
    /// - `CartError::StoreUnavailable` on catalog or store failure/timeout
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        owner: &UserId,
        product_id: ProductId,
        variant_key: &str,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let product = with_timeout(
            self.inner.io_timeout,
            "catalog lookup",
            self.inner.catalog.get_product(product_id),
        )
        .await?
        .ok_or(CartError::ProductNotFound(product_id))?;

        let unit_price =
            product
                .unit_price(variant_key)
                .ok_or_else(|| CartError::VariantNotFound {
                    product_id,
                    variant_key: variant_key.to_owned(),
                })?;

        let _guard = self.lock(owner).await;
        let now = Utc::now();
        let mut cart = self
            .load(owner)
            .await?
            .unwrap_or_else(|| Cart::new(owner.clone(), now));

        cart.add_line(
            NewCartLine {
                product_id,
                variant_key: variant_key.to_owned(),
                quantity,
                unit_price,
                display_name: product.display_name(variant_key),
            },
            now,
        )?;
        self.persist(owner, &mut cart).await?;

        tracing::info!(
            %product_id,
            variant_key,
            quantity,
            %unit_price,
            total = %cart.total(),
            "Added item to cart"
        );
        Ok(cart)
    }

    /// Set the quantity of a line already in the cart. Zero removes it.
    ///
    /// When the last line is removed the stored cart is deleted and an empty
    /// cart is returned.
    ///
    /// # Errors
    ///
    /// - `CartError::CartNotFound` if the owner has no stored cart
    /// - `CartError::LineNotFound` if the cart has no such line
    /// - `CartError::Conflict` / `CartError::StoreUnavailable` on store failures
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        owner: &UserId,
        product_id: ProductId,
        variant_key: &str,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        let _guard = self.lock(owner).await;
        let mut cart = self.load(owner).await?.ok_or(CartError::CartNotFound)?;

        cart.set_quantity(product_id, variant_key, quantity, Utc::now())
            .map_err(|missing| CartError::LineNotFound {
                product_id: missing.product_id,
                variant_key: missing.variant_key,
            })?;

        if cart.is_empty() {
            self.remove(owner).await?;
            tracing::info!("Removed last line; cart deleted");
        } else {
            self.persist(owner, &mut cart).await?;
        }

        Ok(cart)
    }

    /// Delete the owner's cart. Succeeds if there is none.
    ///
    /// # Errors
    ///
    /// Returns `CartError::StoreUnavailable` if the cart store fails.
    #[instrument(skip(self))]
    pub async fn clear(&self, owner: &UserId) -> Result<(), CartError> {
        let _guard = self.lock(owner).await;
        self.remove(owner).await
    }

    /// Take the owner's lock. Checkout holds it across order creation.
    pub(crate) async fn lock(&self, owner: &UserId) -> OwnedMutexGuard<()> {
        self.inner.locks.acquire(owner).await
    }

    /// Read the stored cart without locking. Callers must hold the owner lock.
    pub(crate) async fn load(&self, owner: &UserId) -> Result<Option<Cart>, CartError> {
        with_timeout(
            self.inner.io_timeout,
            "cart read",
            self.inner.store.get(owner),
        )
        .await
    }

    /// Delete the stored cart without locking. Callers must hold the owner lock.
    async fn remove(&self, owner: &UserId) -> Result<(), CartError> {
        with_timeout(
            self.inner.io_timeout,
            "cart delete",
            self.inner.store.delete(owner),
        )
        .await
    }

    /// Drop what checkout ordered from the owner's cart. Callers must hold
    /// the owner lock.
    ///
    /// The cart is deleted only if it is still the version that was ordered.
    /// If it has moved on, the ordered quantities are subtracted and whatever
    /// was added since survives as a new cart.
    pub(crate) async fn release(
        &self,
        owner: &UserId,
        ordered: &Cart,
    ) -> Result<(), CartError> {
        match with_timeout(
            self.inner.io_timeout,
            "cart delete",
            self.inner.store.delete_if(owner, ordered.version()),
        )
        .await
        {
            Err(CartError::Conflict) => {}
            other => return other,
        }

        let Some(current) = self.load(owner).await? else {
            return Ok(());
        };
        if current.cart_id() != ordered.cart_id() {
            // Already carried over by an earlier attempt.
            return Ok(());
        }

        let mut rest = current.remainder_after(ordered.lines(), Utc::now());
        if rest.is_empty() {
            with_timeout(
                self.inner.io_timeout,
                "cart delete",
                self.inner.store.delete_if(owner, current.version()),
            )
            .await
        } else {
            self.persist(owner, &mut rest).await?;
            tracing::warn!(
                lines = rest.lines().len(),
                "Cart changed during checkout; kept items added after the order"
            );
            Ok(())
        }
    }

    pub(crate) fn io_timeout(&self) -> Duration {
        self.inner.io_timeout
    }

    async fn persist(&self, owner: &UserId, cart: &mut Cart) -> Result<(), CartError> {
        let version = with_timeout(
            self.inner.io_timeout,
            "cart write",
            self.inner.store.set(owner, cart),
        )
        .await?;
        cart.mark_persisted(version);
        Ok(())
    }
}
