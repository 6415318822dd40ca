//! Application services shared by route handlers.

pub mod auth;
pub mod bulk;
pub mod catalog_cache;
