//! Category route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use trellis_core::CategoryId;

use crate::db::CategoryRepository;
use crate::error::{AppError, FieldError, Result};
use crate::middleware::auth::RequireAdmin;
use crate::models::category::Category;
use crate::state::AppState;

/// Maximum category name length.
const MAX_NAME_LENGTH: usize = 100;

/// Build the categories router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/{id}", get(get_category).delete(delete_category))
}

/// List all categories.
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(Json(categories))
}

/// Fetch one category.
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Category>> {
    CategoryRepository::new(state.pool())
        .get(CategoryId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("category {id}")))
}

/// Create-category payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    pub default_price: Decimal,
}

/// Create a category. Duplicate names respond 409.
#[instrument(skip(_admin, state, body), fields(name = %body.name))]
pub async fn create_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let mut errors = Vec::new();
    let name = body.name.trim();
    if name.is_empty() {
        errors.push(FieldError::new("name", "must not be empty"));
    } else if name.len() > MAX_NAME_LENGTH {
        errors.push(FieldError::new(
            "name",
            format!("must be at most {MAX_NAME_LENGTH} characters"),
        ));
    }
    if body.default_price.is_sign_negative() {
        errors.push(FieldError::new("defaultPrice", "must not be negative"));
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let category = CategoryRepository::new(state.pool())
        .create(name, body.default_price)
        .await?;
    state.listing_cache().invalidate_all();

    Ok((StatusCode::CREATED, Json(category)))
}

/// Delete a category. Member products are left intact; the cascade only
/// removes junction rows. Responds 404 when the ID does not exist.
#[instrument(skip(_admin, state))]
pub async fn delete_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool())
        .delete(CategoryId::new(id))
        .await?;
    state.listing_cache().invalidate_all();

    Ok(StatusCode::NO_CONTENT)
}
