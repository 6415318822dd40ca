//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! trellis-cli admin create -u admin -p "a long password"
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string

use trellis_core::Username;
use trellis_server::services::auth;

use super::CliError;

/// Create an admin account, or promote an existing account with the
/// same username. The password is replaced either way.
///
/// The registration endpoint only grants admin to the very first
/// account; this command is the escape hatch for every later one.
///
/// # Errors
///
/// Returns `CliError::InvalidInput` when the username or password fails
/// validation, `CliError::Database` for database failures.
pub async fn create(username: &str, password: &str) -> Result<i32, CliError> {
    let username =
        Username::parse(username).map_err(|e| CliError::InvalidInput(e.to_string()))?;
    if password.len() < 8 {
        return Err(CliError::InvalidInput(
            "password must be at least 8 characters".to_owned(),
        ));
    }

    let password_hash =
        auth::hash_password(password).map_err(|e| CliError::InvalidInput(e.to_string()))?;

    let pool = super::connect().await?;

    let (id, promoted): (i32, bool) = sqlx::query_as(
        "INSERT INTO users (username, password_hash, is_admin) VALUES ($1, $2, TRUE) \
         ON CONFLICT (username) DO UPDATE \
         SET password_hash = EXCLUDED.password_hash, is_admin = TRUE \
         RETURNING id, (xmax <> 0)",
    )
    .bind(username.as_str())
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;

    if promoted {
        tracing::info!("Existing account '{}' promoted to admin (id {id})", username.as_str());
    } else {
        tracing::info!("Admin account '{}' created (id {id})", username.as_str());
    }

    Ok(id)
}
