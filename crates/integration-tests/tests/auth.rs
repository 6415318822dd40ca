//! Integration tests for session authentication and access control.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p trellis-server)
//!
//! Run with: cargo test -p trellis-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};

use trellis_integration_tests::{TestContext, unique};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn register_logs_the_account_in() {
    let ctx = TestContext::new();
    let username = unique("it-user");

    let resp = ctx
        .client
        .post(format!("{}/api/auth/register", ctx.base_url))
        .json(&json!({"username": username, "password": "long enough pw"}))
        .send()
        .await
        .expect("register failed");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let me: Value = ctx
        .client
        .get(format!("{}/api/user", ctx.base_url))
        .send()
        .await
        .expect("whoami failed")
        .json()
        .await
        .expect("not JSON");
    assert_eq!(me["username"], json!(username));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn second_account_is_not_admin() {
    // The suite's admin context already guarantees at least one account
    // exists, so this registration can never be the first.
    let _admin = TestContext::admin().await;

    let ctx = TestContext::new();
    let body = ctx
        .post_json(
            "/api/auth/register",
            &json!({"username": unique("it-user"), "password": "long enough pw"}),
        )
        .await;
    assert_eq!(body["isAdmin"], json!(false));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn duplicate_username_conflicts() {
    let ctx = TestContext::new();
    let username = unique("it-dup");
    let payload = json!({"username": username, "password": "long enough pw"});

    let first = ctx
        .client
        .post(format!("{}/api/auth/register", ctx.base_url))
        .json(&payload)
        .send()
        .await
        .expect("register failed");
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = TestContext::new();
    let resp = second
        .client
        .post(format!("{}/api/auth/register", second.base_url))
        .json(&payload)
        .send()
        .await
        .expect("register failed");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn wrong_password_and_unknown_user_look_identical() {
    let ctx = TestContext::new();
    let username = unique("it-login");
    ctx.post_json(
        "/api/auth/register",
        &json!({"username": username, "password": "long enough pw"}),
    )
    .await;

    let attempt = |username: String, password: &'static str| {
        let client = TestContext::new();
        async move {
            client
                .client
                .post(format!("{}/api/auth/login", client.base_url))
                .json(&json!({"username": username, "password": password}))
                .send()
                .await
                .expect("login failed")
        }
    };

    let wrong_pw = attempt(username.clone(), "not the password").await;
    let unknown = attempt(unique("it-ghost"), "not the password").await;

    assert_eq!(wrong_pw.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let a: Value = wrong_pw.json().await.expect("not JSON");
    let b: Value = unknown.json().await.expect("not JSON");
    assert_eq!(a["error"], b["error"]);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn logout_clears_the_session() {
    let ctx = TestContext::new();
    ctx.post_json(
        "/api/auth/register",
        &json!({"username": unique("it-out"), "password": "long enough pw"}),
    )
    .await;

    let resp = ctx
        .client
        .post(format!("{}/api/auth/logout", ctx.base_url))
        .send()
        .await
        .expect("logout failed");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let me = ctx
        .client
        .get(format!("{}/api/user", ctx.base_url))
        .send()
        .await
        .expect("whoami failed");
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn non_admin_mutations_are_forbidden() {
    // Make sure an account exists so ours is not the first.
    let _admin = TestContext::admin().await;

    let ctx = TestContext::new();
    ctx.post_json(
        "/api/auth/register",
        &json!({"username": unique("it-pleb"), "password": "long enough pw"}),
    )
    .await;

    let resp = ctx
        .client
        .post(format!("{}/api/products", ctx.base_url))
        .json(&json!({"name": "nope"}))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn weak_password_reports_a_field_error() {
    let ctx = TestContext::new();
    let resp = ctx
        .client
        .post(format!("{}/api/auth/register", ctx.base_url))
        .json(&json!({"username": unique("it-weak"), "password": "short"}))
        .send()
        .await
        .expect("register failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.expect("not JSON");
    assert_eq!(body["fields"][0]["path"], json!("password"));
}
