//! Product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use trellis_core::{CategoryId, ProductId, effective_price};

use super::category::Category;

/// A catalog entry with its full (deduplicated) category set.
///
/// `price` is the display price computed at assembly time: the custom
/// override when set, else the cheapest category default, else zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// Product description.
    pub description: String,
    /// Preview image encodings (thumbnails).
    pub preview_images: Vec<String>,
    /// Full-resolution image encodings.
    pub full_images: Vec<String>,
    /// Whether the product can currently be added to carts.
    pub is_available: bool,
    /// Optional price override.
    pub custom_price: Option<Decimal>,
    /// Display price (see the effective-price rule).
    pub price: Decimal,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// Associated categories, deduplicated.
    pub categories: Vec<Category>,
}

impl Product {
    /// Recompute the display price from the current override and categories.
    #[must_use]
    pub fn computed_price(&self) -> Decimal {
        let defaults: Vec<Decimal> = self.categories.iter().map(|c| c.default_price).collect();
        effective_price(self.custom_price, &defaults)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub preview_images: Vec<String>,
    pub full_images: Vec<String>,
    pub custom_price: Option<Decimal>,
    pub category_ids: Vec<CategoryId>,
}

/// Partial update for a product.
///
/// `None` means "leave the field untouched". `custom_price` is doubly
/// optional so a patch can distinguish "don't touch the override" from
/// "clear the override". When `category_ids` is present the association
/// set is fully replaced; when absent it is preserved untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub preview_images: Option<Vec<String>>,
    pub full_images: Option<Vec<String>>,
    pub is_available: Option<bool>,
    pub custom_price: Option<Option<Decimal>>,
    pub category_ids: Option<Vec<CategoryId>>,
}

impl ProductPatch {
    /// Whether the patch changes any product column (as opposed to only
    /// the category associations).
    #[must_use]
    pub const fn touches_columns(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.preview_images.is_some()
            || self.full_images.is_some()
            || self.is_available.is_some()
            || self.custom_price.is_some()
    }
}

/// One page of a product listing.
///
/// `next_page` is present iff the page is full (length == requested
/// limit). This is an approximation: at an exact boundary the client
/// fetches one empty extra page, which is acceptable for infinite scroll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;
    use trellis_core::CategoryId;

    fn category(id: i32, default_price: Decimal) -> Category {
        Category {
            id: CategoryId::new(id),
            name: format!("cat-{id}"),
            default_price,
            created_at: Utc::now(),
        }
    }

    fn product(custom_price: Option<Decimal>, categories: Vec<Category>) -> Product {
        let mut p = Product {
            id: ProductId::new(1),
            name: "Jacket".to_string(),
            description: String::new(),
            preview_images: vec![],
            full_images: vec![],
            is_available: true,
            custom_price,
            price: Decimal::ZERO,
            created_at: Utc::now(),
            categories,
        };
        p.price = p.computed_price();
        p
    }

    #[test]
    fn price_uses_custom_override_first() {
        let p = product(Some(dec!(42)), vec![category(1, dec!(10))]);
        assert_eq!(p.price, dec!(42));
    }

    #[test]
    fn price_falls_back_to_cheapest_category() {
        let p = product(None, vec![category(1, dec!(10)), category(2, dec!(4.50))]);
        assert_eq!(p.price, dec!(4.50));
    }

    #[test]
    fn price_is_zero_without_override_or_categories() {
        let p = product(None, vec![]);
        assert_eq!(p.price, Decimal::ZERO);
    }

    #[test]
    fn empty_patch_touches_nothing() {
        let patch = ProductPatch::default();
        assert!(!patch.touches_columns());
        assert!(patch.category_ids.is_none());
    }

    #[test]
    fn next_page_omitted_when_none() {
        let page = ProductPage {
            products: vec![],
            next_page: None,
        };
        let json = serde_json::to_value(&page).expect("serialize");
        assert!(json.get("nextPage").is_none());
    }
}
