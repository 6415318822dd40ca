//! Domain types.
//!
//! These types are the JSON-facing shapes of the API as well as the
//! assembled results of repository reads. Raw row shapes live in the
//! `db` modules.

pub mod cart;
pub mod category;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem, CartSummary, NewCart, NewCartItem};
pub use category::Category;
pub use product::{NewProduct, Product, ProductPage, ProductPatch};
pub use session::{CurrentUser, session_keys};
pub use user::User;
