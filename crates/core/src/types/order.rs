//! Durable order records produced by checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cart::{Cart, CartLine, CartSnapshot};
use super::id::{AddressId, OrderId, ProductId, UserId};
use super::money::Money;

/// An immutable copy of a cart line taken at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub variant_key: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub display_name: String,
    pub line_total: Money,
}

impl From<&CartLine> for OrderLineItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            variant_key: line.variant_key.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            display_name: line.display_name.clone(),
            line_total: line.line_total(),
        }
    }
}

/// A committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub total_amount: Money,
    pub line_items: Vec<OrderLineItem>,
    pub created_at: DateTime<Utc>,
}

/// Everything the order store needs to create an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub address_id: AddressId,
    /// The cart's snapshotted total; never recomputed from the catalog.
    pub total_amount: Money,
    pub line_items: Vec<OrderLineItem>,
    /// The exact cart state this order was produced from.
    pub snapshot: CartSnapshot,
}

impl NewOrder {
    /// Freeze a cart into an order request.
    #[must_use]
    pub fn from_cart(cart: &Cart, address_id: AddressId) -> Self {
        Self {
            user_id: cart.owner_id().clone(),
            address_id,
            total_amount: cart.total(),
            line_items: cart.lines().iter().map(OrderLineItem::from).collect(),
            snapshot: cart.snapshot(),
        }
    }
}
