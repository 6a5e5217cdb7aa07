//! Order persistence.
//!
//! Each order records the snapshot reference (`cart_id:version`) of the cart
//! it was created from. The column is unique, which is what makes checkout
//! safe to repeat.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use sneakersku_core::{
    AddressId, CartSnapshot, Money, NewOrder, Order, OrderId, OrderLineItem, UserId,
};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    address_id: AddressId,
    total_amount: Decimal,
    line_items: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let line_items: Vec<OrderLineItem> =
            serde_json::from_value(row.line_items).map_err(|e| {
                RepositoryError::DataCorruption(format!(
                    "invalid line items for order {}: {e}",
                    row.id
                ))
            })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            address_id: row.address_id,
            total_amount: Money::new(row.total_amount),
            line_items,
            created_at: row.created_at,
        })
    }
}

/// Repository for `storefront.customer_order`.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order, or return the existing order for the same snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        let inserted: Option<OrderId> = sqlx::query_scalar(
            r"
            INSERT INTO storefront.customer_order
                (user_id, address_id, total_amount, line_items, cart_snapshot)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (cart_snapshot) DO NOTHING
            RETURNING id
            ",
        )
        .bind(&order.user_id)
        .bind(order.address_id)
        .bind(order.total_amount)
        .bind(Json(&order.line_items))
        .bind(order.snapshot.to_string())
        .fetch_optional(self.pool)
        .await?;

        if let Some(id) = inserted {
            return Ok(id);
        }

        // Lost the race to a concurrent insert of the same snapshot.
        self.find_by_snapshot(&order.snapshot).await?.ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "order for snapshot {} conflicted but was not found",
                order.snapshot
            ))
        })
    }

    /// Find the order created from a cart snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_snapshot(
        &self,
        snapshot: &CartSnapshot,
    ) -> Result<Option<OrderId>, RepositoryError> {
        let id = sqlx::query_scalar(
            r"
            SELECT id FROM storefront.customer_order
            WHERE cart_snapshot = $1
            ",
        )
        .bind(snapshot.to_string())
        .fetch_optional(self.pool)
        .await?;

        Ok(id)
    }

    /// List a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if stored line items are invalid.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, address_id, total_amount, line_items, created_at
            FROM storefront.customer_order
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
