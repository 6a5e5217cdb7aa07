//! Database operations for the API's `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `catalog.shoe` - Products with their variants (JSONB), read-only here
//! - `storefront.address` - Shipping addresses, scoped by `user_id`
//! - `storefront.customer_order` - Committed orders, unique per cart snapshot
//! - `auth.api_token` - SHA-256 digests of issued bearer tokens
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p sneakersku-cli -- migrate
//! ```

pub mod addresses;
pub mod orders;
pub mod shoes;
pub mod tokens;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use sneakersku_core::{
    Address, AddressId, CartSnapshot, NewOrder, Order, OrderId, Product, ProductId, UserId,
};

pub use addresses::AddressRepository;
pub use orders::OrderRepository;
pub use shoes::ShoeRepository;
pub use tokens::TokenRepository;

use crate::services::auth::hash_token;
use crate::services::{
    AuthError, AuthGate, CatalogError, CatalogReader, Identity, OrderStore, OrderStoreError,
};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => Self::Unavailable(e.to_string()),
            RepositoryError::DataCorruption(msg) => Self::Corrupt(msg),
        }
    }
}

impl From<RepositoryError> for OrderStoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => Self::Unavailable(e.to_string()),
            RepositoryError::DataCorruption(msg) => Self::Corrupt(msg),
        }
    }
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// `PostgreSQL` adapter for the catalog, order store and auth gate ports.
#[derive(Clone)]
pub struct PgStores {
    pool: PgPool,
}

impl PgStores {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogReader for PgStores {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(ShoeRepository::new(&self.pool).get_by_id(id).await?)
    }
}

#[async_trait]
impl OrderStore for PgStores {
    async fn create_order(&self, order: &NewOrder) -> Result<OrderId, OrderStoreError> {
        Ok(OrderRepository::new(&self.pool).create(order).await?)
    }

    async fn find_order_by_snapshot(
        &self,
        snapshot: &CartSnapshot,
    ) -> Result<Option<OrderId>, OrderStoreError> {
        Ok(OrderRepository::new(&self.pool)
            .find_by_snapshot(snapshot)
            .await?)
    }

    async fn find_address(
        &self,
        id: AddressId,
        user_id: &UserId,
    ) -> Result<Option<Address>, OrderStoreError> {
        Ok(AddressRepository::new(&self.pool)
            .get_for_user(id, user_id)
            .await?)
    }

    async fn list_orders(&self, user_id: &UserId) -> Result<Vec<Order>, OrderStoreError> {
        Ok(OrderRepository::new(&self.pool).list_for_user(user_id).await?)
    }

    async fn ping(&self) -> Result<(), OrderStoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| OrderStoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl AuthGate for PgStores {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        TokenRepository::new(&self.pool)
            .find_active(&hash_token(token), Utc::now())
            .await?
            .ok_or(AuthError::InvalidToken)
    }
}
