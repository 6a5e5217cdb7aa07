//! API token commands.
//!
//! # Usage
//!
//! ```bash
//! # Issue a shopper token valid for the configured default lifetime
//! sk-cli token issue -u user-123
//!
//! # Issue an admin token valid for 10 minutes
//! sk-cli token issue -u staff-1 -r admin -t 600
//! ```
//!
//! # Environment Variables
//!
//! - `API_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `AUTH_TOKEN_TTL_SECS` - Default token lifetime

use std::time::Duration;

use chrono::Utc;

use sneakersku_api::config::AuthConfig;
use sneakersku_api::db::TokenRepository;
use sneakersku_core::{Role, UserId};

use super::{CommandError, connect};

/// Issue a token and print it to stdout.
///
/// The plaintext token is shown once; only its digest is stored.
pub async fn issue(user: &str, role: &str, ttl_secs: Option<u64>) -> Result<(), CommandError> {
    let user = user.trim();
    if user.is_empty() {
        return Err(CommandError::EmptyUserId);
    }
    let role: Role = role
        .parse()
        .map_err(|_| CommandError::InvalidRole(role.to_owned()))?;

    let ttl = match ttl_secs {
        Some(secs) => Duration::from_secs(secs),
        None => AuthConfig::from_env()?.token_ttl,
    };
    let ttl = chrono::Duration::from_std(ttl).map_err(|_| CommandError::InvalidTtl)?;
    let expires_at = Utc::now()
        .checked_add_signed(ttl)
        .ok_or(CommandError::InvalidTtl)?;

    let pool = connect().await?;
    let user_id = UserId::new(user);
    let token = TokenRepository::new(&pool)
        .issue(&user_id, role, expires_at)
        .await?;

    tracing::info!(
        user_id = %user_id,
        role = %role,
        expires_at = %expires_at,
        "Token issued"
    );

    #[allow(clippy::print_stdout)]
    {
        println!("{token}");
    }
    Ok(())
}

/// Delete expired tokens.
pub async fn purge() -> Result<u64, CommandError> {
    let pool = connect().await?;
    let removed = TokenRepository::new(&pool)
        .purge_expired(Utc::now())
        .await?;

    tracing::info!(removed, "Expired tokens purged");
    Ok(removed)
}
