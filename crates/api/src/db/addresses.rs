//! Address lookups, always scoped to the owning user.

use sqlx::PgPool;

use sneakersku_core::{Address, AddressId, UserId};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    user_id: UserId,
    street: String,
    phone: String,
    label: String,
    is_primary: bool,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            street: row.street,
            phone: row.phone,
            label: row.label,
            is_primary: row.is_primary,
        }
    }
}

/// Read-only access to `storefront.address`.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an address if it belongs to `user_id`.
    ///
    /// Another user's address is indistinguishable from a missing one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        id: AddressId,
        user_id: &UserId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, user_id, street, phone, label, is_primary
            FROM storefront.address
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Address::from))
    }
}
