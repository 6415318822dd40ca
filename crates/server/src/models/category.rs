//! Category domain type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use trellis_core::CategoryId;

/// A price-bearing tag, many-to-many with products.
///
/// The `default_price` participates in the effective-price rule: a product
/// without a custom price is priced at the minimum default among its
/// categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Unique category ID.
    pub id: CategoryId,
    /// Unique category name (enforced by the schema).
    pub name: String,
    /// Default price applied to member products without an override.
    pub default_price: Decimal,
    /// When the category was created.
    pub created_at: DateTime<Utc>,
}
