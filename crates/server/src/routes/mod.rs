//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Liveness check
//! GET  /health/ready                 - Readiness check (pings the database)
//!
//! # Products
//! GET    /api/products               - Paginated/filtered listing (public)
//! POST   /api/products               - Create product (admin)
//! PATCH  /api/products/{id}          - Partial update incl. category replace (admin)
//! DELETE /api/products/{id}          - Delete product (admin)
//! POST   /api/products/bulk-availability    - Bulk set availability (admin)
//! POST   /api/products/bulk-delete          - Bulk delete (admin)
//! POST   /api/products/bulk-assign-category - Bulk assign/remove categories (admin)
//!
//! # Categories
//! GET    /api/categories             - List (public)
//! GET    /api/categories/{id}        - Fetch (public)
//! POST   /api/categories             - Create (admin)
//! DELETE /api/categories/{id}        - Delete (admin)
//!
//! # Carts
//! POST   /api/carts                  - Submit a cart (public)
//! GET    /api/carts                  - List summaries (admin)
//! GET    /api/carts/{id}             - Fetch with items (admin)
//! DELETE /api/carts/{id}             - Delete (admin)
//! POST   /api/carts/{id}/make-items-unavailable - Flip referenced products (admin)
//!
//! # Auth
//! POST /api/auth/register            - Create account (first account = admin)
//! POST /api/auth/login               - Session login
//! POST /api/auth/logout              - Clear session
//! GET  /api/user                     - Current identity
//! ```

pub mod auth;
pub mod carts;
pub mod categories;
pub mod products;

use axum::Router;

use crate::state::AppState;

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/products", products::router())
        .nest("/api/categories", categories::router())
        .nest("/api/carts", carts::router())
        .merge(auth::router())
}
