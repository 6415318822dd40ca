//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to
//! Sentry before responding. All route handlers return
//! `Result<T, AppError>`; storage-layer errors propagate here untouched
//! and are converted to the right HTTP status. Error bodies are JSON:
//! validation failures itemize per-field problems, server errors stay
//! generic in release builds and carry detail in debug builds.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;

/// One field-level validation problem.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    /// Path into the request body, e.g. `items[1].price`.
    pub path: String,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    /// Build a field error.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request payload failed validation.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// No session / not logged in.
    #[error("authentication required")]
    Unauthenticated,

    /// Logged in but lacking admin privilege.
    #[error("admin privileges required")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Conflict with existing state (e.g. duplicate category name).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Repository(RepositoryError),

    /// Authentication operation failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a single-field validation error.
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(path, message)])
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        // NotFound and Conflict keep their HTTP meaning instead of
        // collapsing into a 500.
        match e {
            RepositoryError::NotFound => Self::NotFound("entity not found".to_owned()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Repository(other),
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Repository(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Repository(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UsernameTaken => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidUsername(_) => {
                    StatusCode::BAD_REQUEST
                }
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        };

        let fields = match &self {
            Self::Validation(errors) => Some(errors.clone()),
            Self::Auth(AuthError::InvalidUsername(e)) => {
                Some(vec![FieldError::new("username", e.to_string())])
            }
            Self::Auth(AuthError::WeakPassword(msg)) => {
                Some(vec![FieldError::new("password", msg.clone())])
            }
            _ => None,
        };

        // Don't expose internal error details to clients in release builds
        let (message, detail) = if status == StatusCode::INTERNAL_SERVER_ERROR {
            let detail = cfg!(debug_assertions).then(|| self.to_string());
            ("Internal server error".to_owned(), detail)
        } else {
            (self.to_string(), None)
        };

        (
            status,
            Json(ErrorBody {
                error: message,
                fields,
                detail,
            }),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
