//! Core types for Trellis.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod username;

pub use id::*;
pub use price::effective_price;
pub use username::{Username, UsernameError};
