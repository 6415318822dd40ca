//! Seed the catalog with sample categories and products.
//!
//! Intended for local development; running it twice inserts a second
//! copy of the products (names are not unique), so wipe the database or
//! don't re-run.

use rust_decimal::{Decimal, dec};

use super::CliError;

struct SeedCategory {
    name: &'static str,
    default_price: Decimal,
}

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    custom_price: Option<Decimal>,
    categories: &'static [&'static str],
}

fn sample_categories() -> Vec<SeedCategory> {
    vec![
        SeedCategory {
            name: "Vintage",
            default_price: dec!(10),
        },
        SeedCategory {
            name: "Outerwear",
            default_price: dec!(25),
        },
        SeedCategory {
            name: "Accessories",
            default_price: dec!(5),
        },
    ]
}

fn sample_products() -> Vec<SeedProduct> {
    vec![
        SeedProduct {
            name: "Denim Jacket",
            description: "Washed denim, 90s cut.",
            custom_price: None,
            categories: &["Vintage", "Outerwear"],
        },
        SeedProduct {
            name: "Wool Scarf",
            description: "Hand-loomed, single lot.",
            custom_price: Some(dec!(12.50)),
            categories: &["Accessories"],
        },
        SeedProduct {
            name: "Leather Belt",
            description: "",
            custom_price: None,
            categories: &["Vintage", "Accessories"],
        },
    ]
}

/// Insert the sample catalog.
///
/// Categories are upserted by name; products are inserted fresh each
/// run.
///
/// # Errors
///
/// Returns `CliError::Database` if any insert fails.
pub async fn run() -> Result<(), CliError> {
    let pool = super::connect().await?;
    let mut tx = pool.begin().await?;

    for category in sample_categories() {
        sqlx::query(
            "INSERT INTO categories (name, default_price) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET default_price = EXCLUDED.default_price",
        )
        .bind(category.name)
        .bind(category.default_price)
        .execute(&mut *tx)
        .await?;
    }

    let mut inserted = 0;
    for product in sample_products() {
        let product_id: i32 = sqlx::query_scalar(
            "INSERT INTO products (name, description, preview_images, full_images, is_available, custom_price) \
             VALUES ($1, $2, '{}', '{}', TRUE, $3) RETURNING id",
        )
        .bind(product.name)
        .bind(product.description)
        .bind(product.custom_price)
        .fetch_one(&mut *tx)
        .await?;

        for category_name in product.categories {
            sqlx::query(
                "INSERT INTO product_categories (product_id, category_id) \
                 SELECT $1, id FROM categories WHERE name = $2 \
                 ON CONFLICT DO NOTHING",
            )
            .bind(product_id)
            .bind(category_name)
            .execute(&mut *tx)
            .await?;
        }

        inserted += 1;
    }

    tx.commit().await?;

    tracing::info!("Seeded {} categories, {inserted} products", sample_categories().len());
    Ok(())
}
