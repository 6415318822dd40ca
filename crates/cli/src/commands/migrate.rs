//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! trellis-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! The session table is not part of these migrations; the server creates
//! it at startup through the session store.

use super::CliError;

/// Run the schema migrations embedded from `crates/server/migrations/`.
///
/// Already-applied migrations are skipped, so this is safe to run on
/// every deploy.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or a migration
/// fails to apply.
pub async fn run() -> Result<(), CliError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations");
    sqlx::migrate!("../server/migrations").run(&pool).await?;
    tracing::info!("Migrations complete");

    Ok(())
}
