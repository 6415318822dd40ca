//! Database operations for the Trellis `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Site accounts (first account created becomes admin)
//! - `categories` - Price-bearing tags, many-to-many with products
//! - `products` - Catalog entries
//! - `product_categories` - Product/category junction
//! - `carts` - Customer submissions
//! - `cart_items` - Immutable product snapshots belonging to a cart
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p trellis-cli -- migrate
//! ```
//!
//! All queries use the runtime sqlx APIs (`query`, `query_as`,
//! `QueryBuilder`) so the workspace builds without a live database.

pub mod carts;
pub mod categories;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use categories::CategoryRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate category name).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool.
///
/// Pool exhaustion surfaces as an acquire timeout rather than queueing
/// indefinitely.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
