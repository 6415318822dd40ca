//! Account registration and login.
//!
//! Passwords are hashed with Argon2id. The session itself is managed by
//! tower-sessions; this module only produces the authenticated `User`.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use thiserror::Error;

use trellis_core::{Username, UsernameError};

use crate::db::{RepositoryError, UserRepository};
use crate::models::user::User;

/// Minimum accepted password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid username format.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    /// Invalid credentials (wrong password or unknown username).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Username already taken.
    #[error("username already taken")]
    UsernameTaken,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

/// Register a new account. The repository makes the first account admin.
///
/// # Errors
///
/// Returns `AuthError::InvalidUsername` or `AuthError::WeakPassword` when
/// the inputs fail validation, `AuthError::UsernameTaken` on a duplicate,
/// `AuthError::Repository` for database failures.
pub async fn register(pool: &PgPool, username: &str, password: &str) -> Result<User, AuthError> {
    let username = Username::parse(username)?;
    validate_password(password)?;

    let password_hash = hash_password(password)?;

    UserRepository::new(pool)
        .create(&username, &password_hash)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UsernameTaken,
            other => AuthError::Repository(other),
        })
}

/// Log an existing account in.
///
/// Unknown usernames and wrong passwords produce the same error, so the
/// response never reveals which accounts exist.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` when the username or password
/// is wrong, `AuthError::Repository` for database failures.
pub async fn login(pool: &PgPool, username: &str, password: &str) -> Result<User, AuthError> {
    let username = Username::parse(username).map_err(|_| AuthError::InvalidCredentials)?;

    let Some((user, password_hash)) = UserRepository::new(pool)
        .get_with_password_hash(&username)
        .await?
    else {
        return Err(AuthError::InvalidCredentials);
    };

    if verify_password(&password_hash, password)? {
        Ok(user)
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the stored hash is
/// unparseable.
pub fn verify_password(hash: &str, password: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password(&hash, "correct horse battery").unwrap());
        assert!(!verify_password(&hash, "wrong password").unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("not-a-phc-string", "pw"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough password").is_ok());
    }
}
