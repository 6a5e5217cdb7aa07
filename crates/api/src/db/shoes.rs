//! Shoe catalog queries.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sqlx::PgPool;

use sneakersku_core::{Money, Product, ProductId, Variant};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct ShoeRow {
    id: i32,
    name: String,
    base_price: Decimal,
    variants: serde_json::Value,
}

impl TryFrom<ShoeRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ShoeRow) -> Result<Self, Self::Error> {
        let variants: BTreeMap<String, Variant> = serde_json::from_value(row.variants)
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid variants for shoe {}: {e}", row.id))
            })?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            base_price: Money::new(row.base_price),
            variants,
        })
    }
}

/// Read-only access to `catalog.shoe`.
pub struct ShoeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShoeRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a shoe with all of its variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the variants JSON is invalid.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ShoeRow>(
            r"
            SELECT id, name, base_price, variants
            FROM catalog.shoe
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}
