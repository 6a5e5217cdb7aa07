//! CLI command implementations.

pub mod migrate;
pub mod token;

use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use sneakersku_api::config::{ConfigError, get_database_url};

/// Connect to the API database named by `API_DATABASE_URL` / `DATABASE_URL`.
async fn connect() -> Result<PgPool, CommandError> {
    let database_url: SecretString = get_database_url("API_DATABASE_URL")?;

    tracing::info!("Connecting to API database...");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(secrecy::ExposeSecret::expose_secret(&database_url))
        .await?;
    Ok(pool)
}

/// Errors shared by all commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] sneakersku_api::db::RepositoryError),

    #[error("Invalid role: {0}. Valid roles: user, admin")]
    InvalidRole(String),

    #[error("Invalid user ID: must not be empty")]
    EmptyUserId,

    #[error("Token lifetime out of range")]
    InvalidTtl,
}
