//! Integration tests for Trellis.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! cargo run -p trellis-cli -- migrate
//!
//! # Start the server
//! cargo run -p trellis-server
//!
//! # Run integration tests
//! cargo test -p trellis-integration-tests -- --ignored
//! ```
//!
//! Tests are `#[ignore]`d by default because they require a running
//! server. Each test creates its own uniquely named fixtures, so the
//! suite can run repeatedly against the same database.

use std::sync::atomic::{AtomicU32, Ordering};

use reqwest::Client;
use serde_json::{Value, json};

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("TRELLIS_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A unique suffix for fixture names, stable within one test run.
#[must_use]
pub fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{nanos}-{n}")
}

/// A cookie-holding client plus the base URL it talks to.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

impl TestContext {
    /// Create an anonymous context.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: base_url(),
        }
    }

    /// Create a context logged in as an admin.
    ///
    /// Registers a fresh account and, when that account is not the first
    /// (and therefore not admin), falls back to the account named by
    /// `TRELLIS_TEST_ADMIN_USERNAME` / `TRELLIS_TEST_ADMIN_PASSWORD`.
    ///
    /// # Panics
    ///
    /// Panics if no admin session can be established.
    pub async fn admin() -> Self {
        let ctx = Self::new();

        let username = unique("it-admin");
        let body = ctx
            .post_json(
                "/api/auth/register",
                &json!({"username": username, "password": "integration-test-pw"}),
            )
            .await;
        if body["isAdmin"] == json!(true) {
            return ctx;
        }

        let username = std::env::var("TRELLIS_TEST_ADMIN_USERNAME")
            .expect("database already has users; set TRELLIS_TEST_ADMIN_USERNAME");
        let password = std::env::var("TRELLIS_TEST_ADMIN_PASSWORD")
            .expect("set TRELLIS_TEST_ADMIN_PASSWORD");

        let ctx = Self::new();
        let resp = ctx
            .client
            .post(format!("{}/api/auth/login", ctx.base_url))
            .json(&json!({"username": username, "password": password}))
            .send()
            .await
            .expect("login request failed");
        assert!(resp.status().is_success(), "admin login rejected");
        ctx
    }

    /// POST a JSON body and return the parsed response body.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or the response is not JSON.
    pub async fn post_json(&self, path: &str, body: &Value) -> Value {
        self.client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .expect("request failed")
            .json()
            .await
            .expect("response was not JSON")
    }

    /// Create a category, returning its ID.
    ///
    /// # Panics
    ///
    /// Panics if the creation fails.
    pub async fn create_category(&self, name: &str, default_price: &str) -> i64 {
        let body = self
            .post_json(
                "/api/categories",
                &json!({"name": name, "defaultPrice": default_price}),
            )
            .await;
        body["id"].as_i64().expect("category creation failed")
    }

    /// Create a product, returning its ID.
    ///
    /// # Panics
    ///
    /// Panics if the creation fails.
    pub async fn create_product(&self, name: &str, category_ids: &[i64]) -> i64 {
        let body = self
            .post_json(
                "/api/products",
                &json!({"name": name, "categoryIds": category_ids}),
            )
            .await;
        body["id"].as_i64().expect("product creation failed")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
