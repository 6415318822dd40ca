//! Cart repository for database operations.
//!
//! Cart creation is the canonical transactional path: one cart row plus N
//! item snapshot rows commit together or not at all, so a failed insert
//! can never leave a partial cart behind.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use trellis_core::{CartId, CartItemId, ProductId};

use super::RepositoryError;
use crate::models::cart::{Cart, CartItem, CartSummary, NewCart};

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i32,
    customer_name: String,
    customer_email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: i32,
    product_id: i32,
    name: String,
    description: String,
    preview_images: Vec<String>,
    is_available: bool,
    price: Decimal,
    created_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: CartItemId::new(row.id),
            product_id: ProductId::new(row.product_id),
            name: row.name,
            description: row.description,
            preview_images: row.preview_images,
            is_available: row.is_available,
            price: row.price,
            created_at: row.created_at,
        }
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a cart submission: the cart row and every item snapshot in
    /// one transaction. Duplicate product IDs among the items are allowed;
    /// client-side duplicate guarding is a UX convenience only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails (in which
    /// case nothing is persisted).
    pub async fn create(&self, new: &NewCart) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let cart: CartRow = sqlx::query_as(
            "INSERT INTO carts (customer_name, customer_email) VALUES ($1, $2) \
             RETURNING id, customer_name, customer_email, created_at, updated_at",
        )
        .bind(&new.customer_name)
        .bind(&new.customer_email)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(new.items.len());
        for (position, item) in new.items.iter().enumerate() {
            let row: CartItemRow = sqlx::query_as(
                "INSERT INTO cart_items \
                 (cart_id, position, product_id, name, description, preview_images, is_available, price) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 RETURNING id, product_id, name, description, preview_images, is_available, price, created_at",
            )
            .bind(cart.id)
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .bind(item.product_id.as_i32())
            .bind(&item.name)
            .bind(&item.description)
            .bind(&item.preview_images)
            .bind(item.is_available)
            .bind(item.price)
            .fetch_one(&mut *tx)
            .await?;

            items.push(row.into());
        }

        tx.commit().await?;

        Ok(Cart {
            id: CartId::new(cart.id),
            customer_name: cart.customer_name,
            customer_email: cart.customer_email,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
            items,
        })
    }

    /// List cart summaries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, offset: i64, limit: i64) -> Result<Vec<CartSummary>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct SummaryRow {
            id: i32,
            customer_name: String,
            customer_email: String,
            created_at: DateTime<Utc>,
            updated_at: DateTime<Utc>,
            item_count: i64,
        }

        let rows: Vec<SummaryRow> = sqlx::query_as(
            "SELECT ca.id, ca.customer_name, ca.customer_email, ca.created_at, ca.updated_at, \
             COUNT(ci.id) AS item_count \
             FROM carts ca LEFT JOIN cart_items ci ON ci.cart_id = ca.id \
             GROUP BY ca.id \
             ORDER BY ca.created_at DESC, ca.id DESC OFFSET $1 LIMIT $2",
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CartSummary {
                id: CartId::new(row.id),
                customer_name: row.customer_name,
                customer_email: row.customer_email,
                created_at: row.created_at,
                updated_at: row.updated_at,
                item_count: row.item_count,
            })
            .collect())
    }

    /// Get a cart with its item snapshots in submission order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let cart: Option<CartRow> = sqlx::query_as(
            "SELECT id, customer_name, customer_email, created_at, updated_at \
             FROM carts WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        let Some(cart) = cart else {
            return Ok(None);
        };

        let items: Vec<CartItemRow> = sqlx::query_as(
            "SELECT id, product_id, name, description, preview_images, is_available, price, created_at \
             FROM cart_items WHERE cart_id = $1 ORDER BY position",
        )
        .bind(cart.id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(Cart {
            id: CartId::new(cart.id),
            customer_name: cart.customer_name,
            customer_email: cart.customer_email,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
            items: items.into_iter().map(CartItem::from).collect(),
        }))
    }

    /// Delete a cart; item snapshots go with it via the cascading key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart doesn't exist,
    /// `RepositoryError::Database` for other failures.
    pub async fn delete(&self, id: CartId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Every distinct product ID referenced by a cart's snapshots.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart doesn't exist,
    /// `RepositoryError::Database` for other failures.
    pub async fn product_ids(&self, id: CartId) -> Result<Vec<ProductId>, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM carts WHERE id = $1)")
            .bind(id.as_i32())
            .fetch_one(self.pool)
            .await?;
        if !exists {
            return Err(RepositoryError::NotFound);
        }

        let ids: Vec<i32> = sqlx::query_scalar(
            "SELECT DISTINCT product_id FROM cart_items WHERE cart_id = $1 ORDER BY product_id",
        )
        .bind(id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(ids.into_iter().map(ProductId::new).collect())
    }

    /// Recopy the live availability of each referenced product into the
    /// cart's snapshots. Best-effort denormalization: snapshots of deleted
    /// products are left as they were.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn refresh_item_availability(&self, id: CartId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE cart_items ci SET is_available = p.is_available \
             FROM products p WHERE p.id = ci.product_id AND ci.cart_id = $1",
        )
        .bind(id.as_i32())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
            .bind(id.as_i32())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
