//! Product repository for database operations.
//!
//! Listings and single-product reads always return the product together
//! with its deduplicated category set, assembled from a left join and
//! regrouped by product ID. Multi-statement mutations (create with
//! associations, update with category replacement) run inside a single
//! transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use trellis_core::{CategoryId, ProductId, effective_price};

use super::RepositoryError;
use crate::models::category::Category;
use crate::models::product::{NewProduct, Product, ProductPatch};

/// Filter for paginated product listings.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Number of products to skip.
    pub offset: i64,
    /// Page size. Callers are expected to clamp this to a sane maximum.
    pub limit: i64,
    /// When present, only products associated with at least one of these
    /// categories match. Products with zero categories never match a
    /// non-empty filter.
    pub category_ids: Option<Vec<CategoryId>>,
    /// When present, only products with this availability match.
    pub is_available: Option<bool>,
}

/// One row of the product/category left join.
#[derive(Debug, sqlx::FromRow)]
struct ProductJoinRow {
    id: i32,
    name: String,
    description: String,
    preview_images: Vec<String>,
    full_images: Vec<String>,
    is_available: bool,
    custom_price: Option<Decimal>,
    created_at: DateTime<Utc>,
    category_id: Option<i32>,
    category_name: Option<String>,
    category_default_price: Option<Decimal>,
    category_created_at: Option<DateTime<Utc>>,
}

/// Join columns shared by every product read.
const PRODUCT_JOIN_COLUMNS: &str = "p.id, p.name, p.description, p.preview_images, \
     p.full_images, p.is_available, p.custom_price, p.created_at, \
     c.id AS category_id, c.name AS category_name, \
     c.default_price AS category_default_price, c.created_at AS category_created_at";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List one page of products, newest first, each with its categories.
    ///
    /// The category filter is applied to the products before pagination
    /// (via an EXISTS over the junction), so filtered pages never leak
    /// products with zero matching categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "WITH page AS (SELECT p.id, p.name, p.description, p.preview_images, \
             p.full_images, p.is_available, p.custom_price, p.created_at \
             FROM products p WHERE TRUE",
        );

        if let Some(is_available) = filter.is_available {
            qb.push(" AND p.is_available = ");
            qb.push_bind(is_available);
        }

        if let Some(category_ids) = &filter.category_ids {
            qb.push(
                " AND EXISTS (SELECT 1 FROM product_categories pc \
                 WHERE pc.product_id = p.id AND pc.category_id = ANY(",
            );
            qb.push_bind(category_ids.clone());
            qb.push("))");
        }

        qb.push(" ORDER BY p.created_at DESC, p.id DESC OFFSET ");
        qb.push_bind(filter.offset);
        qb.push(" LIMIT ");
        qb.push_bind(filter.limit);
        qb.push(
            ") SELECT page.id, page.name, page.description, page.preview_images, \
             page.full_images, page.is_available, page.custom_price, page.created_at, \
             c.id AS category_id, c.name AS category_name, \
             c.default_price AS category_default_price, c.created_at AS category_created_at \
             FROM page \
             LEFT JOIN product_categories pc ON pc.product_id = page.id \
             LEFT JOIN categories c ON c.id = pc.category_id \
             ORDER BY page.created_at DESC, page.id DESC, c.id",
        );

        let rows: Vec<ProductJoinRow> = qb.build_query_as().fetch_all(self.pool).await?;
        Ok(group_rows(rows))
    }

    /// Get a single product with its categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_JOIN_COLUMNS} FROM products p \
             LEFT JOIN product_categories pc ON pc.product_id = p.id \
             LEFT JOIN categories c ON c.id = pc.category_id \
             WHERE p.id = $1 ORDER BY c.id"
        );
        let rows: Vec<ProductJoinRow> = sqlx::query_as(&sql)
            .bind(id.as_i32())
            .fetch_all(self.pool)
            .await?;

        Ok(group_rows(rows).into_iter().next())
    }

    /// Create a product (defaulted to available) and its category
    /// associations in one transaction, then return the freshly
    /// reassembled product so the caller always sees the joined shape.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a supplied category ID does
    /// not exist, `RepositoryError::Database` for other failures.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            "INSERT INTO products (name, description, preview_images, full_images, custom_price) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.preview_images)
        .bind(&new.full_images)
        .bind(new.custom_price)
        .fetch_one(&mut *tx)
        .await?;

        if !new.category_ids.is_empty() {
            insert_associations(&mut tx, id, &new.category_ids).await?;
        }

        tx.commit().await?;

        // Second read: reassemble with categories rather than echoing the
        // raw insert.
        self.get(ProductId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial update. When `category_ids` is present the prior
    /// association set is fully replaced (delete-then-insert) inside the
    /// same transaction; when absent, associations are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist,
    /// `RepositoryError::Conflict` if a replacement category ID is
    /// unknown, `RepositoryError::Database` for other failures.
    pub async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if patch.touches_columns() {
            let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("UPDATE products SET ");
            let mut fields = qb.separated(", ");
            if let Some(name) = &patch.name {
                fields.push("name = ");
                fields.push_bind_unseparated(name.clone());
            }
            if let Some(description) = &patch.description {
                fields.push("description = ");
                fields.push_bind_unseparated(description.clone());
            }
            if let Some(preview_images) = &patch.preview_images {
                fields.push("preview_images = ");
                fields.push_bind_unseparated(preview_images.clone());
            }
            if let Some(full_images) = &patch.full_images {
                fields.push("full_images = ");
                fields.push_bind_unseparated(full_images.clone());
            }
            if let Some(is_available) = patch.is_available {
                fields.push("is_available = ");
                fields.push_bind_unseparated(is_available);
            }
            if let Some(custom_price) = patch.custom_price {
                fields.push("custom_price = ");
                fields.push_bind_unseparated(custom_price);
            }
            qb.push(" WHERE id = ");
            qb.push_bind(id.as_i32());

            let result = qb.build().execute(&mut *tx).await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
        } else {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                    .bind(id.as_i32())
                    .fetch_one(&mut *tx)
                    .await?;
            if !exists {
                return Err(RepositoryError::NotFound);
            }
        }

        if let Some(category_ids) = &patch.category_ids {
            sqlx::query("DELETE FROM product_categories WHERE product_id = $1")
                .bind(id.as_i32())
                .execute(&mut *tx)
                .await?;

            if !category_ids.is_empty() {
                insert_associations(&mut tx, id.as_i32(), category_ids).await?;
            }
        }

        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Junction rows are removed by the cascading
    /// foreign key; cart item snapshots survive.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist,
    /// `RepositoryError::Database` for other failures.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Set a product's availability flag. Setting the current value again
    /// is a successful no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist,
    /// `RepositoryError::Database` for other failures.
    pub async fn set_availability(
        &self,
        id: ProductId,
        is_available: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE products SET is_available = $2 WHERE id = $1")
            .bind(id.as_i32())
            .bind(is_available)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Add category associations without disturbing existing ones.
    /// Duplicate associations are ignored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist,
    /// `RepositoryError::Conflict` if a category ID is unknown,
    /// `RepositoryError::Database` for other failures.
    pub async fn assign_categories(
        &self,
        id: ProductId,
        category_ids: &[CategoryId],
    ) -> Result<(), RepositoryError> {
        if category_ids.is_empty() {
            return self.ensure_exists(id).await;
        }

        let mut tx = self.pool.begin().await?;
        insert_associations(&mut tx, id.as_i32(), category_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Remove the given category associations from a product. Missing
    /// associations are ignored; other products are unaffected.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist,
    /// `RepositoryError::Database` for other failures.
    pub async fn remove_categories(
        &self,
        id: ProductId,
        category_ids: &[CategoryId],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(id.as_i32())
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM product_categories WHERE product_id = $1 AND category_id = ANY($2)")
            .bind(id.as_i32())
            .bind(category_ids.to_vec())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn ensure_exists(&self, id: ProductId) -> Result<(), RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(id.as_i32())
                .fetch_one(self.pool)
                .await?;
        if exists {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}

/// Insert junction rows for a product, mapping foreign key violations to
/// the entity that is actually missing.
async fn insert_associations(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    product_id: i32,
    category_ids: &[CategoryId],
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO product_categories (product_id, category_id) \
         SELECT $1::INT4, UNNEST($2::INT4[]) ON CONFLICT DO NOTHING",
    )
    .bind(product_id)
    .bind(category_ids.to_vec())
    .execute(&mut **tx)
    .await
    .map_err(map_junction_error)?;

    Ok(())
}

/// A product FK violation means the product is gone (NotFound); a
/// category FK violation means the caller supplied an unknown category.
fn map_junction_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return match db_err.constraint() {
            Some("product_categories_product_id_fkey") => RepositoryError::NotFound,
            _ => RepositoryError::Conflict("unknown category id".to_owned()),
        };
    }
    RepositoryError::Database(e)
}

/// Regroup join rows into products, preserving row order (newest product
/// first) and accumulating each product's distinct categories.
fn group_rows(rows: Vec<ProductJoinRow>) -> Vec<Product> {
    let mut products: Vec<Product> = Vec::new();
    let mut index_by_id: std::collections::HashMap<i32, usize> = std::collections::HashMap::new();

    for row in rows {
        let idx = match index_by_id.get(&row.id) {
            Some(&idx) => idx,
            None => {
                index_by_id.insert(row.id, products.len());
                products.push(Product {
                    id: ProductId::new(row.id),
                    name: row.name,
                    description: row.description,
                    preview_images: row.preview_images,
                    full_images: row.full_images,
                    is_available: row.is_available,
                    custom_price: row.custom_price,
                    price: Decimal::ZERO,
                    created_at: row.created_at,
                    categories: Vec::new(),
                });
                products.len() - 1
            }
        };

        if let (Some(category_id), Some(name), Some(default_price), Some(created_at)) = (
            row.category_id,
            row.category_name,
            row.category_default_price,
            row.category_created_at,
        ) && let Some(product) = products.get_mut(idx)
            && !product
                .categories
                .iter()
                .any(|c| c.id.as_i32() == category_id)
        {
            product.categories.push(Category {
                id: CategoryId::new(category_id),
                name,
                default_price,
                created_at,
            });
        }
    }

    for product in &mut products {
        let defaults: Vec<Decimal> = product.categories.iter().map(|c| c.default_price).collect();
        product.price = effective_price(product.custom_price, &defaults);
    }

    products
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn row(product_id: i32, category: Option<(i32, &str, Decimal)>) -> ProductJoinRow {
        ProductJoinRow {
            id: product_id,
            name: format!("product-{product_id}"),
            description: String::new(),
            preview_images: vec![],
            full_images: vec![],
            is_available: true,
            custom_price: None,
            created_at: Utc::now(),
            category_id: category.map(|(id, _, _)| id),
            category_name: category.map(|(_, name, _)| name.to_owned()),
            category_default_price: category.map(|(_, _, price)| price),
            category_created_at: category.map(|_| Utc::now()),
        }
    }

    #[test]
    fn grouping_merges_rows_per_product() {
        let rows = vec![
            row(2, Some((1, "Vintage", dec!(10)))),
            row(2, Some((2, "Outerwear", dec!(25)))),
            row(1, None),
        ];
        let products = group_rows(rows);

        assert_eq!(products.len(), 2);
        let first = products.first().expect("first product");
        assert_eq!(first.id, ProductId::new(2));
        assert_eq!(first.categories.len(), 2);
        let second = products.get(1).expect("second product");
        assert!(second.categories.is_empty());
    }

    #[test]
    fn grouping_deduplicates_categories() {
        let rows = vec![
            row(1, Some((1, "Vintage", dec!(10)))),
            row(1, Some((1, "Vintage", dec!(10)))),
        ];
        let products = group_rows(rows);
        assert_eq!(products.len(), 1);
        assert_eq!(products.first().expect("product").categories.len(), 1);
    }

    #[test]
    fn grouping_computes_display_price() {
        let rows = vec![
            row(1, Some((1, "Vintage", dec!(10)))),
            row(1, Some((2, "Sale", dec!(4)))),
        ];
        let products = group_rows(rows);
        assert_eq!(products.first().expect("product").price, dec!(4));
    }

    #[test]
    fn grouping_prefers_custom_price() {
        let mut joined = row(1, Some((1, "Vintage", dec!(10))));
        joined.custom_price = Some(dec!(99));
        let products = group_rows(vec![joined]);
        assert_eq!(products.first().expect("product").price, dec!(99));
    }

    #[test]
    fn product_with_no_rows_groups_to_empty() {
        assert!(group_rows(vec![]).is_empty());
    }
}
