//! Session-based authentication routes.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get, routing::post};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::auth::OptionalUser;
use crate::models::{CurrentUser, session_keys};
use crate::services::auth;
use crate::state::AppState;

/// Build the auth router. Routes live at the API root rather than under
/// a nest so that `/api/user` keeps its flat path.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/user", get(current_user))
}

/// Credentials payload shared by register and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Create an account and log it in. The first account ever created
/// becomes the admin.
#[instrument(skip(state, session, body), fields(username = %body.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<CurrentUser>)> {
    let user = auth::register(state.pool(), &body.username, &body.password).await?;
    let current = CurrentUser::from(&user);
    store_identity(&session, &current).await?;

    tracing::info!(user_id = user.id.as_i32(), is_admin = user.is_admin, "account created");
    Ok((StatusCode::CREATED, Json(current)))
}

/// Log in and store the identity in the session.
#[instrument(skip(state, session, body), fields(username = %body.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<CurrentUser>> {
    let user = auth::login(state.pool(), &body.username, &body.password).await?;

    // Rotate the session ID on privilege change.
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Internal(format!("session rotation failed: {e}")))?;

    let current = CurrentUser::from(&user);
    store_identity(&session, &current).await?;

    Ok(Json(current))
}

/// Destroy the session. Idempotent; logging out twice is fine.
pub async fn logout(session: Session) -> Result<StatusCode> {
    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("session flush failed: {e}")))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Who am I. Responds 401 when there is no session user.
pub async fn current_user(OptionalUser(user): OptionalUser) -> Result<Json<CurrentUser>> {
    user.map(Json).ok_or(AppError::Unauthenticated)
}

async fn store_identity(session: &Session, current: &CurrentUser) -> Result<()> {
    session
        .insert(session_keys::CURRENT_USER, current)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))
}
