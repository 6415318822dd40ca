//! Session-stored identity.

use serde::{Deserialize, Serialize};

use trellis_core::UserId;

use super::user::User;

/// Session storage keys.
pub mod session_keys {
    /// Key under which the logged-in user is stored.
    pub const CURRENT_USER: &str = "trellis.current_user";
}

/// The identity stored in the session cookie after login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// Account ID.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Admin privilege flag, checked by the `RequireAdmin` extractor.
    pub is_admin: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.as_str().to_owned(),
            is_admin: user.is_admin,
        }
    }
}
