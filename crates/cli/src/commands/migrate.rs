//! Database migration command.
//!
//! ```bash
//! sk-cli migrate
//! ```
//!
//! Migrations live in `crates/api/migrations/` and are embedded at build time.

use super::{CommandError, connect};

/// Run all pending API migrations.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running API migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("API migrations complete!");
    Ok(())
}
