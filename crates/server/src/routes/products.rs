//! Product route handlers: listing, CRUD, and bulk mutations.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use tracing::instrument;

use trellis_core::{CategoryId, ProductId};

use crate::db::{ProductRepository, products::ProductFilter};
use crate::error::{AppError, FieldError, Result};
use crate::middleware::auth::RequireAdmin;
use crate::models::product::{NewProduct, Product, ProductPage, ProductPatch};
use crate::services::bulk::{self, BulkReport};
use crate::services::catalog_cache::ListingKey;
use crate::state::AppState;

/// Default listing page size.
const DEFAULT_PAGE_SIZE: i64 = 20;

/// Hard cap on the listing page size.
const MAX_PAGE_SIZE: i64 = 100;

/// Maximum product name length.
const MAX_NAME_LENGTH: usize = 200;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            axum::routing::patch(update_product).delete(delete_product),
        )
        .route("/bulk-availability", post(bulk_availability))
        .route("/bulk-delete", post(bulk_delete))
        .route("/bulk-assign-category", post(bulk_assign_category))
}

/// Listing query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, clamped to [`MAX_PAGE_SIZE`].
    pub limit: Option<i64>,
    /// Comma-separated category IDs.
    pub category_id: Option<String>,
    pub is_available: Option<bool>,
}

/// Paginated, filtered product listing.
///
/// The client decides "is there a next page" from `nextPage`, which is
/// present iff the returned page is full.
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<ProductPage>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let category_ids = query
        .category_id
        .as_deref()
        .map(parse_category_ids)
        .transpose()?;

    let key = ListingKey::new(page, limit, category_ids.as_deref(), query.is_available);
    if let Some(cached) = state.listing_cache().get(&key).await {
        return Ok(Json(cached.as_ref().clone()));
    }

    let filter = ProductFilter {
        offset: i64::from(page - 1) * limit,
        limit,
        category_ids,
        is_available: query.is_available,
    };

    let products = ProductRepository::new(state.pool()).list(&filter).await?;
    let next_page = (products.len() as i64 == limit).then(|| page + 1);
    let result = ProductPage {
        products,
        next_page,
    };

    state
        .listing_cache()
        .insert(key, Arc::new(result.clone()))
        .await;

    Ok(Json(result))
}

/// Create-product payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub preview_images: Vec<String>,
    #[serde(default)]
    pub full_images: Vec<String>,
    pub custom_price: Option<Decimal>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

/// Create a product. Defaults to available; categories are associated in
/// the same transaction.
#[instrument(skip(_admin, state, body), fields(name = %body.name))]
pub async fn create_product(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let mut errors = Vec::new();
    validate_name(&body.name, &mut errors);
    validate_price("customPrice", body.custom_price, &mut errors);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let new = NewProduct {
        name: body.name.trim().to_owned(),
        description: body.description,
        preview_images: body.preview_images,
        full_images: body.full_images,
        custom_price: body.custom_price,
        category_ids: body.category_ids,
    };

    let product = ProductRepository::new(state.pool()).create(&new).await?;
    state.listing_cache().invalidate_all();

    Ok((StatusCode::CREATED, Json(product)))
}

/// Update-product payload.
///
/// Absent fields are left untouched. `customPrice` distinguishes "absent"
/// from "explicitly null" (clear the override); `categoryIds`, when
/// present, fully replaces the association set.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub preview_images: Option<Vec<String>>,
    pub full_images: Option<Vec<String>>,
    pub is_available: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub custom_price: Option<Option<Decimal>>,
    pub category_ids: Option<Vec<CategoryId>>,
}

/// Deserialize a field where "absent" and "null" mean different things.
fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partially update a product.
#[instrument(skip(_admin, state, body))]
pub async fn update_product(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    let mut errors = Vec::new();
    if let Some(name) = &body.name {
        validate_name(name, &mut errors);
    }
    if let Some(custom_price) = body.custom_price {
        validate_price("customPrice", custom_price, &mut errors);
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let patch = ProductPatch {
        name: body.name.map(|n| n.trim().to_owned()),
        description: body.description,
        preview_images: body.preview_images,
        full_images: body.full_images,
        is_available: body.is_available,
        custom_price: body.custom_price,
        category_ids: body.category_ids,
    };

    let product = ProductRepository::new(state.pool())
        .update(ProductId::new(id), &patch)
        .await?;
    state.listing_cache().invalidate_all();

    Ok(Json(product))
}

/// Delete a product. Responds 404 when the ID does not exist.
#[instrument(skip(_admin, state))]
pub async fn delete_product(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool())
        .delete(ProductId::new(id))
        .await?;
    state.listing_cache().invalidate_all();

    Ok(StatusCode::NO_CONTENT)
}

/// Bulk availability payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAvailabilityRequest {
    pub product_ids: Vec<ProductId>,
    pub is_available: bool,
}

/// Set availability on a batch of products.
#[instrument(skip(_admin, state, body), fields(count = body.product_ids.len()))]
pub async fn bulk_availability(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<BulkAvailabilityRequest>,
) -> Result<Json<BulkReport<ProductId>>> {
    let ids = require_ids(body.product_ids)?;

    let pool = state.pool().clone();
    let is_available = body.is_available;
    let report = bulk::run_batched(&ids, bulk::DEFAULT_BATCH_SIZE, |id| {
        let pool = pool.clone();
        async move {
            ProductRepository::new(&pool)
                .set_availability(id, is_available)
                .await
        }
    })
    .await;

    state.listing_cache().invalidate_all();
    log_bulk_outcome("bulk availability", &report);
    Ok(Json(report))
}

/// Bulk delete payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRequest {
    pub product_ids: Vec<ProductId>,
}

/// Delete a batch of products.
#[instrument(skip(_admin, state, body), fields(count = body.product_ids.len()))]
pub async fn bulk_delete(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<Json<BulkReport<ProductId>>> {
    let ids = require_ids(body.product_ids)?;

    let pool = state.pool().clone();
    let report = bulk::run_batched(&ids, bulk::DEFAULT_BATCH_SIZE, |id| {
        let pool = pool.clone();
        async move { ProductRepository::new(&pool).delete(id).await }
    })
    .await;

    state.listing_cache().invalidate_all();
    log_bulk_outcome("bulk delete", &report);
    Ok(Json(report))
}

/// Whether a bulk category mutation adds or removes the given set.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BulkCategoryMode {
    #[default]
    Assign,
    Remove,
}

/// Bulk category payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCategoryRequest {
    pub product_ids: Vec<ProductId>,
    pub category_ids: Vec<CategoryId>,
    #[serde(default)]
    pub mode: BulkCategoryMode,
}

/// Assign or remove a category set on a batch of products.
#[instrument(skip(_admin, state, body), fields(count = body.product_ids.len(), mode = ?body.mode))]
pub async fn bulk_assign_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<BulkCategoryRequest>,
) -> Result<Json<BulkReport<ProductId>>> {
    let ids = require_ids(body.product_ids)?;
    if body.category_ids.is_empty() {
        return Err(AppError::invalid("categoryIds", "must not be empty"));
    }

    let pool = state.pool().clone();
    let category_ids = body.category_ids;
    let mode = body.mode;
    let report = bulk::run_batched(&ids, bulk::DEFAULT_BATCH_SIZE, |id| {
        let pool = pool.clone();
        let category_ids = category_ids.clone();
        async move {
            let repo = ProductRepository::new(&pool);
            match mode {
                BulkCategoryMode::Assign => repo.assign_categories(id, &category_ids).await,
                BulkCategoryMode::Remove => repo.remove_categories(id, &category_ids).await,
            }
        }
    })
    .await;

    state.listing_cache().invalidate_all();
    log_bulk_outcome("bulk category", &report);
    Ok(Json(report))
}

/// Validate and deduplicate a bulk target list, preserving order.
fn require_ids(ids: Vec<ProductId>) -> Result<Vec<ProductId>> {
    if ids.is_empty() {
        return Err(AppError::invalid("productIds", "must not be empty"));
    }

    let mut seen = std::collections::HashSet::new();
    Ok(ids.into_iter().filter(|id| seen.insert(*id)).collect())
}

fn log_bulk_outcome(operation: &str, report: &BulkReport<ProductId>) {
    if report.failed.is_empty() {
        tracing::info!(succeeded = report.succeeded.len(), "{operation} completed");
    } else {
        tracing::warn!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "{operation} completed with errors"
        );
    }
}

fn validate_name(name: &str, errors: &mut Vec<FieldError>) {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new("name", "must not be empty"));
    } else if trimmed.len() > MAX_NAME_LENGTH {
        errors.push(FieldError::new(
            "name",
            format!("must be at most {MAX_NAME_LENGTH} characters"),
        ));
    }
}

fn validate_price(path: &str, price: Option<Decimal>, errors: &mut Vec<FieldError>) {
    if let Some(price) = price
        && price.is_sign_negative()
    {
        errors.push(FieldError::new(path, "must not be negative"));
    }
}

/// Parse a comma-separated category filter.
fn parse_category_ids(raw: &str) -> Result<Vec<CategoryId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>().map(CategoryId::new).map_err(|_| {
                AppError::invalid("categoryId", format!("'{s}' is not a valid category id"))
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn category_filter_parses_comma_separated_ids() {
        let ids = parse_category_ids("1, 2,3").unwrap();
        assert_eq!(
            ids,
            vec![CategoryId::new(1), CategoryId::new(2), CategoryId::new(3)]
        );
    }

    #[test]
    fn category_filter_rejects_garbage() {
        assert!(parse_category_ids("1,abc").is_err());
    }

    #[test]
    fn category_filter_ignores_empty_segments() {
        let ids = parse_category_ids("5,,").unwrap();
        assert_eq!(ids, vec![CategoryId::new(5)]);
    }

    #[test]
    fn require_ids_deduplicates_preserving_order() {
        let ids = require_ids(vec![
            ProductId::new(2),
            ProductId::new(1),
            ProductId::new(2),
        ])
        .unwrap();
        assert_eq!(ids, vec![ProductId::new(2), ProductId::new(1)]);
    }

    #[test]
    fn require_ids_rejects_empty() {
        assert!(require_ids(vec![]).is_err());
    }

    #[test]
    fn update_payload_distinguishes_absent_from_null_price() {
        let absent: UpdateProductRequest = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(absent.custom_price, None);

        let null: UpdateProductRequest = serde_json::from_str(r#"{"customPrice":null}"#).unwrap();
        assert_eq!(null.custom_price, Some(None));

        let set: UpdateProductRequest = serde_json::from_str(r#"{"customPrice":"9.50"}"#).unwrap();
        assert!(matches!(set.custom_price, Some(Some(_))));
    }

    #[test]
    fn update_payload_without_categories_leaves_them_untouched() {
        let body: UpdateProductRequest =
            serde_json::from_str(r#"{"isAvailable":false}"#).unwrap();
        assert!(body.category_ids.is_none());

        let body: UpdateProductRequest =
            serde_json::from_str(r#"{"categoryIds":[]}"#).unwrap();
        assert_eq!(body.category_ids, Some(vec![]));
    }
}
