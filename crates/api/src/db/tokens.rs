//! API token storage.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sneakersku_core::{Role, UserId};

use super::RepositoryError;
use crate::services::Identity;
use crate::services::auth::{generate_token, hash_token};

#[derive(Debug, sqlx::FromRow)]
struct TokenRow {
    user_id: UserId,
    role: Role,
}

/// Repository for `auth.api_token`.
pub struct TokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Issue a token for `user_id` valid until `expires_at`.
    ///
    /// Returns the plaintext token. It is not stored and cannot be recovered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn issue(
        &self,
        user_id: &UserId,
        role: Role,
        expires_at: DateTime<Utc>,
    ) -> Result<String, RepositoryError> {
        let token = generate_token();

        sqlx::query(
            r"
            INSERT INTO auth.api_token (token_hash, user_id, role, expires_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(hash_token(&token))
        .bind(user_id)
        .bind(role)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        Ok(token)
    }

    /// Find the identity behind an unexpired token digest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_active(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<Identity>, RepositoryError> {
        let row = sqlx::query_as::<_, TokenRow>(
            r"
            SELECT user_id, role
            FROM auth.api_token
            WHERE token_hash = $1 AND expires_at > $2
            ",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|row| Identity {
            user_id: row.user_id,
            role: row.role,
        }))
    }

    /// Delete expired tokens. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM auth.api_token WHERE expires_at <= $1")
            .bind(now)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
