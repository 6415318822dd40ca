//! Cart domain types.
//!
//! A cart is a terminal customer submission: an ordered collection of
//! product snapshots taken at submission time. Snapshots never
//! recalculate, even if the underlying product is edited or deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use trellis_core::{CartId, CartItemId, ProductId};

/// A submitted cart with its item snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Unique cart ID.
    pub id: CartId,
    /// Customer display name.
    pub customer_name: String,
    /// Customer contact email.
    pub customer_email: String,
    /// When the cart was submitted.
    pub created_at: DateTime<Utc>,
    /// When the cart row was last touched (e.g. snapshot availability refresh).
    pub updated_at: DateTime<Utc>,
    /// Item snapshots in submission order.
    pub items: Vec<CartItem>,
}

/// A single item snapshot inside a cart.
///
/// `product_id` is a plain reference without a foreign key; the snapshot
/// stays valid after the product is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Unique snapshot row ID.
    pub id: CartItemId,
    /// The product this snapshot was taken from.
    pub product_id: ProductId,
    /// Product name at submission time.
    pub name: String,
    /// Product description at submission time.
    pub description: String,
    /// Preview images at submission time.
    pub preview_images: Vec<String>,
    /// Denormalized availability; refreshed best-effort by
    /// make-items-unavailable, never authoritative.
    pub is_available: bool,
    /// Effective price at submission time. Never recalculated.
    pub price: Decimal,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
}

/// A cart row without its items, for admin listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub id: CartId,
    pub customer_name: String,
    pub customer_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of item snapshots in the cart.
    pub item_count: i64,
}

/// Input for a cart submission.
#[derive(Debug, Clone)]
pub struct NewCart {
    pub customer_name: String,
    pub customer_email: String,
    pub items: Vec<NewCartItem>,
}

/// One item snapshot in a submission, assembled client-side.
///
/// The server does not assume product IDs are unique within a submission;
/// duplicate guarding is a client-side convenience only.
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub preview_images: Vec<String>,
    pub is_available: bool,
    pub price: Decimal,
}
