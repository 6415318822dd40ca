//! Cart route handlers.
//!
//! Submission is public; everything else is admin-only. Submitted carts
//! are immutable snapshots, so there is no update route.

use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use trellis_core::{CartId, ProductId};

use crate::db::{CartRepository, ProductRepository};
use crate::error::{AppError, FieldError, Result};
use crate::middleware::auth::RequireAdmin;
use crate::models::cart::{Cart, CartSummary, NewCart, NewCartItem};
use crate::services::bulk::{self, BulkReport};
use crate::state::AppState;

/// Default and maximum page sizes for the admin cart listing.
const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Maximum customer name length.
const MAX_CUSTOMER_NAME_LENGTH: usize = 200;

/// Maximum number of item snapshots accepted in one submission.
const MAX_ITEMS_PER_CART: usize = 100;

/// Attempts per product when flipping availability from a cart.
const UNAVAILABLE_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between those attempts; grows linearly per retry.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Build the carts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_carts).post(create_cart))
        .route("/{id}", get(get_cart).delete(delete_cart))
        .route("/{id}/make-items-unavailable", post(make_items_unavailable))
}

/// One item snapshot in a submission payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub preview_images: Vec<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    pub price: Decimal,
}

const fn default_true() -> bool {
    true
}

/// Cart submission payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCartRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub items: Vec<CartItemRequest>,
}

/// Submit a cart. Public; customers have no accounts.
///
/// The item snapshots are taken verbatim from the payload. Duplicate
/// product IDs are accepted; the client-side duplicate guard is a UX
/// convenience the server does not rely on.
#[instrument(skip(state, body), fields(items = body.items.len()))]
pub async fn create_cart(
    State(state): State<AppState>,
    Json(body): Json<CreateCartRequest>,
) -> Result<(StatusCode, Json<Cart>)> {
    let new = validate_submission(body)?;
    let cart = CartRepository::new(state.pool()).create(&new).await?;

    tracing::info!(cart_id = cart.id.as_i32(), "cart submitted");
    Ok((StatusCode::CREATED, Json(cart)))
}

/// Admin listing query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCartsQuery {
    pub page: Option<u32>,
    pub limit: Option<i64>,
}

/// List cart summaries, newest first.
pub async fn list_carts(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListCartsQuery>,
) -> Result<Json<Vec<CartSummary>>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let summaries = CartRepository::new(state.pool())
        .list(i64::from(page - 1) * limit, limit)
        .await?;
    Ok(Json(summaries))
}

/// Fetch one cart with its item snapshots.
pub async fn get_cart(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Cart>> {
    CartRepository::new(state.pool())
        .get(CartId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("cart {id}")))
}

/// Delete a cart and its snapshots.
#[instrument(skip(_admin, state))]
pub async fn delete_cart(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    CartRepository::new(state.pool())
        .delete(CartId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Flip every product referenced by a cart to unavailable.
///
/// Each distinct product is retried up to [`UNAVAILABLE_RETRY_ATTEMPTS`]
/// times; products deleted since submission report as failures without
/// aborting their siblings. After the report settles, the cart's own
/// snapshots are refreshed in a detached task: the denormalized
/// `isAvailable` flags are display hints, so a refresh failure is logged
/// and otherwise ignored.
#[instrument(skip(_admin, state))]
pub async fn make_items_unavailable(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<BulkReport<ProductId>>> {
    let cart_id = CartId::new(id);
    let product_ids = CartRepository::new(state.pool()).product_ids(cart_id).await?;

    let pool = state.pool().clone();
    let report = bulk::run_batched(&product_ids, bulk::DEFAULT_BATCH_SIZE, |product_id| {
        let pool = pool.clone();
        async move {
            bulk::with_retries(UNAVAILABLE_RETRY_ATTEMPTS, RETRY_BASE_DELAY, || {
                let pool = pool.clone();
                async move {
                    ProductRepository::new(&pool)
                        .set_availability(product_id, false)
                        .await
                }
            })
            .await
        }
    })
    .await;

    state.listing_cache().invalidate_all();

    if report.failed.is_empty() {
        tracing::info!(
            cart_id = cart_id.as_i32(),
            products = report.succeeded.len(),
            "cart items made unavailable"
        );
    } else {
        tracing::warn!(
            cart_id = cart_id.as_i32(),
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "cart items made unavailable with errors"
        );
    }

    let pool = state.pool().clone();
    tokio::spawn(async move {
        if let Err(e) = CartRepository::new(&pool)
            .refresh_item_availability(cart_id)
            .await
        {
            tracing::warn!(
                cart_id = cart_id.as_i32(),
                error = %e,
                "snapshot availability refresh failed"
            );
        }
    });

    Ok(Json(report))
}

/// Validate a submission payload, collecting every field error.
fn validate_submission(body: CreateCartRequest) -> Result<NewCart> {
    let mut errors = Vec::new();

    let customer_name = body.customer_name.trim();
    if customer_name.is_empty() {
        errors.push(FieldError::new("customerName", "must not be empty"));
    } else if customer_name.len() > MAX_CUSTOMER_NAME_LENGTH {
        errors.push(FieldError::new(
            "customerName",
            format!("must be at most {MAX_CUSTOMER_NAME_LENGTH} characters"),
        ));
    }

    let customer_email = body.customer_email.trim();
    if !is_plausible_email(customer_email) {
        errors.push(FieldError::new("customerEmail", "must be an email address"));
    }

    if body.items.is_empty() {
        errors.push(FieldError::new("items", "must not be empty"));
    } else if body.items.len() > MAX_ITEMS_PER_CART {
        errors.push(FieldError::new(
            "items",
            format!("must contain at most {MAX_ITEMS_PER_CART} items"),
        ));
    }

    for (index, item) in body.items.iter().enumerate() {
        if item.name.trim().is_empty() {
            errors.push(FieldError::new(
                format!("items[{index}].name"),
                "must not be empty",
            ));
        }
        if item.price.is_sign_negative() {
            errors.push(FieldError::new(
                format!("items[{index}].price"),
                "must not be negative",
            ));
        }
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(NewCart {
        customer_name: customer_name.to_owned(),
        customer_email: customer_email.to_owned(),
        items: body
            .items
            .into_iter()
            .map(|item| NewCartItem {
                product_id: item.product_id,
                name: item.name.trim().to_owned(),
                description: item.description,
                preview_images: item.preview_images,
                is_available: item.is_available,
                price: item.price,
            })
            .collect(),
    })
}

/// Cheap shape check only. Real deliverability is out of reach anyway,
/// and the address is contact metadata, not an account identifier.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
