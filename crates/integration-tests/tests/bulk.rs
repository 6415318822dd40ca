//! Integration tests for the bulk product mutations.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p trellis-server)
//!
//! Run with: cargo test -p trellis-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};

use trellis_integration_tests::{TestContext, unique};

/// A product ID that should never exist.
const MISSING_ID: i64 = 999_999_999;

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn bulk_assign_partitions_success_and_failure() {
    let ctx = TestContext::admin().await;

    let category_id = ctx.create_category(&unique("BulkTarget"), "4").await;
    let a = ctx.create_product(&unique("bulk-a"), &[]).await;
    let b = ctx.create_product(&unique("bulk-b"), &[]).await;

    let report: Value = ctx
        .post_json(
            "/api/products/bulk-assign-category",
            &json!({
                "productIds": [a, b, MISSING_ID],
                "categoryIds": [category_id],
            }),
        )
        .await;

    assert_eq!(report["succeeded"], json!([a, b]));
    let failed = report["failed"].as_array().expect("failed array");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["id"], json!(MISSING_ID));
    assert!(
        failed[0]["reason"]
            .as_str()
            .expect("reason string")
            .contains("not found")
    );
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn repeated_assignment_does_not_duplicate_categories() {
    let ctx = TestContext::admin().await;

    let category_id = ctx.create_category(&unique("Idem"), "4").await;
    let product_id = ctx.create_product(&unique("idem-p"), &[category_id]).await;

    // Assign the same category again; the junction insert is ON CONFLICT
    // DO NOTHING, so this must succeed without duplicating.
    let report: Value = ctx
        .post_json(
            "/api/products/bulk-assign-category",
            &json!({"productIds": [product_id], "categoryIds": [category_id]}),
        )
        .await;
    assert_eq!(report["succeeded"], json!([product_id]));

    let page: Value = ctx
        .client
        .get(format!(
            "{}/api/products?categoryId={category_id}",
            ctx.base_url
        ))
        .send()
        .await
        .expect("listing failed")
        .json()
        .await
        .expect("not JSON");
    let product = page["products"]
        .as_array()
        .expect("array")
        .iter()
        .find(|p| p["id"].as_i64() == Some(product_id))
        .expect("product listed")
        .clone();
    assert_eq!(product["categories"].as_array().expect("cats").len(), 1);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn bulk_availability_is_idempotent() {
    let ctx = TestContext::admin().await;
    let product_id = ctx.create_product(&unique("avail"), &[]).await;

    for _ in 0..2 {
        let report: Value = ctx
            .post_json(
                "/api/products/bulk-availability",
                &json!({"productIds": [product_id], "isAvailable": true}),
            )
            .await;
        assert_eq!(report["succeeded"], json!([product_id]));
        assert_eq!(report["failed"], json!([]));
    }
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn bulk_delete_reports_missing_ids() {
    let ctx = TestContext::admin().await;
    let product_id = ctx.create_product(&unique("bulk-del"), &[]).await;

    let report: Value = ctx
        .post_json(
            "/api/products/bulk-delete",
            &json!({"productIds": [product_id, MISSING_ID]}),
        )
        .await;
    assert_eq!(report["succeeded"], json!([product_id]));
    assert_eq!(report["failed"][0]["id"], json!(MISSING_ID));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn bulk_endpoints_reject_empty_target_lists() {
    let ctx = TestContext::admin().await;

    let resp = ctx
        .client
        .post(format!("{}/api/products/bulk-delete", ctx.base_url))
        .json(&json!({"productIds": []}))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn bulk_mutations_are_admin_only() {
    let anon = TestContext::new();
    let resp = anon
        .client
        .post(format!("{}/api/products/bulk-availability", anon.base_url))
        .json(&json!({"productIds": [1], "isAvailable": false}))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
