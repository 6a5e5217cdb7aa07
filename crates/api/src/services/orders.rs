//! Durable order storage and address ownership checks.

use async_trait::async_trait;
use thiserror::Error;

use sneakersku_core::{Address, AddressId, CartSnapshot, NewOrder, Order, OrderId, UserId};

/// Errors raised by order store adapters.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// The durable store could not be reached or failed mid-query.
    #[error("order store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded.
    #[error("order data corrupt: {0}")]
    Corrupt(String),
}

/// Port for the relational store that owns orders and addresses.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order and return its ID.
    ///
    /// Creating an order for a snapshot that already has one must not create a
    /// second order; implementations return the existing order's ID instead.
    async fn create_order(&self, order: &NewOrder) -> Result<OrderId, OrderStoreError>;

    /// Find the order that was created from an exact cart snapshot.
    async fn find_order_by_snapshot(
        &self,
        snapshot: &CartSnapshot,
    ) -> Result<Option<OrderId>, OrderStoreError>;

    /// Find an address, scoped to its owner. Someone else's address is `None`.
    async fn find_address(
        &self,
        id: AddressId,
        user_id: &UserId,
    ) -> Result<Option<Address>, OrderStoreError>;

    /// List a user's orders, newest first.
    async fn list_orders(&self, user_id: &UserId) -> Result<Vec<Order>, OrderStoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), OrderStoreError>;
}
