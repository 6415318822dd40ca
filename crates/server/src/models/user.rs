//! User domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use trellis_core::{UserId, Username};

/// A site account.
///
/// The password hash deliberately lives outside this type; repository
/// methods that need it return it alongside the user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique login name.
    pub username: Username,
    /// Whether the account has admin privileges. The first account ever
    /// created gets this automatically.
    pub is_admin: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}
