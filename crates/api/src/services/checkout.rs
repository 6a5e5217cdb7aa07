//! Checkout: turn the owner's cart into an order, then drop the cart.
//!
//! The order is the source of truth. Once it exists it is never rolled back;
//! deleting the cart afterwards is idempotent cleanup that only removes what
//! was ordered. Lines added by a writer outside the owner lock are kept in a
//! new cart. A cart that survives a failed delete still carries the snapshot
//! reference of the order it produced, so checking it out again returns that
//! order instead of creating a second one.

use std::sync::Arc;

use tracing::instrument;

use sneakersku_core::{AddressId, Cart, NewOrder, OrderId, UserId};

use super::cart::{CartError, CartService};
use super::orders::OrderStore;
use super::retry::RetryPolicy;
use super::with_timeout;

/// Orchestrates the cart → order transition.
#[derive(Clone)]
pub struct CheckoutService {
    carts: CartService,
    orders: Arc<dyn OrderStore>,
    cleanup: RetryPolicy,
}

impl CheckoutService {
    /// Create a checkout service.
    ///
    /// `cleanup` bounds the retries of the post-commit cart delete.
    #[must_use]
    pub fn new(carts: CartService, orders: Arc<dyn OrderStore>, cleanup: RetryPolicy) -> Self {
        Self {
            carts,
            orders,
            cleanup,
        }
    }

    /// Check out the owner's cart to `address_id`.
    ///
    /// The owner's lock is held from the cart read until the cart is deleted,
    /// so other requests for this owner see either the full cart or no cart.
    ///
    /// # Errors
    ///
    /// - `CartError::EmptyCart` if there is no cart or it has no lines
    /// - `CartError::InvalidAddress` if the address is missing or not the owner's
    /// - `CartError::StoreUnavailable` if a store fails before the order exists
    #[instrument(skip(self))]
    pub async fn checkout(
        &self,
        owner: &UserId,
        address_id: AddressId,
    ) -> Result<OrderId, CartError> {
        let io_timeout = self.carts.io_timeout();
        let _guard = self.carts.lock(owner).await;

        let cart = self
            .carts
            .load(owner)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or(CartError::EmptyCart)?;

        with_timeout(
            io_timeout,
            "address lookup",
            self.orders.find_address(address_id, owner),
        )
        .await?
        .ok_or(CartError::InvalidAddress(address_id))?;

        let snapshot = cart.snapshot();
        let existing = with_timeout(
            io_timeout,
            "order lookup",
            self.orders.find_order_by_snapshot(&snapshot),
        )
        .await?;

        let order_id = if let Some(order_id) = existing {
            tracing::warn!(
                %order_id,
                %snapshot,
                "Cart outlived its order; returning existing order"
            );
            order_id
        } else {
            let order = NewOrder::from_cart(&cart, address_id);
            let order_id =
                with_timeout(io_timeout, "order create", self.orders.create_order(&order)).await?;
            tracing::info!(
                %order_id,
                %snapshot,
                total = %order.total_amount,
                lines = order.line_items.len(),
                "Order created"
            );
            order_id
        };

        self.discard_cart(owner, &cart, order_id).await;
        Ok(order_id)
    }

    /// Remove the ordered cart once its order is committed. Failure is
    /// logged, not returned: the next checkout of the same cart reconciles to
    /// `order_id`.
    async fn discard_cart(&self, owner: &UserId, ordered: &Cart, order_id: OrderId) {
        let result = self
            .cleanup
            .run(|| self.carts.release(owner, ordered), CartError::is_retryable)
            .await;

        if let Err(err) = result {
            tracing::error!(
                error = %err,
                %order_id,
                "Failed to delete cart after checkout"
            );
        }
    }
}
