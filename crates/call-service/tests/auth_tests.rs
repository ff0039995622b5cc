//! End-to-end tests for registration, login, and session token
//! validation on protected routes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use call_test_utils::token_builders::TestClaims;
use call_test_utils::{TestCallServer, TestKeypair};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

// ============================================================================
// Registration
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_register_returns_created_with_token(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestCallServer::spawn(pool).await?;

    let response = client()
        .post(format!("{}/v1/auth/register", server.url()))
        .json(&json!({
            "email": "alice@example.com",
            "password": "long-enough-password",
            "display_name": "Alice",
        }))
        .send()
        .await?;

    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await?;
    assert!(body["user_id"].as_str().unwrap().parse::<Uuid>().is_ok());
    assert!(!body["access_token"].as_str().unwrap().is_empty());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 86_400);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_register_duplicate_email_is_conflict(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestCallServer::spawn(pool).await?;
    server.register_user("alice@example.com").await?;

    let response = client()
        .post(format!("{}/v1/auth/register", server.url()))
        .json(&json!({
            "email": "alice@example.com",
            "password": "another-password",
            "display_name": "Alice Again",
        }))
        .send()
        .await?;

    assert_eq!(response.status(), 409);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "CONFLICT");

    // Only one row exists for the email
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind("alice@example.com")
        .fetch_one(server.pool())
        .await?;
    assert_eq!(count.0, 1);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_register_validation_errors(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestCallServer::spawn(pool).await?;

    // Invalid email
    let response = client()
        .post(format!("{}/v1/auth/register", server.url()))
        .json(&json!({
            "email": "not-an-email",
            "password": "long-enough-password",
            "display_name": "Bob",
        }))
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    // Short password
    let response = client()
        .post(format!("{}/v1/auth/register", server.url()))
        .json(&json!({
            "email": "bob@example.com",
            "password": "short",
            "display_name": "Bob",
        }))
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    // Blank display name
    let response = client()
        .post(format!("{}/v1/auth/register", server.url()))
        .json(&json!({
            "email": "bob@example.com",
            "password": "long-enough-password",
            "display_name": "   ",
        }))
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    // No user was created by any of the rejected requests
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(server.pool())
        .await?;
    assert_eq!(count.0, 0);

    Ok(())
}

// ============================================================================
// Login
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_login_success_and_updates_last_login(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestCallServer::spawn(pool).await?;
    let (user_id, _) = server.register_user("alice@example.com").await?;

    let response = client()
        .post(format!("{}/v1/auth/login", server.url()))
        .json(&json!({
            "email": "alice@example.com",
            "password": "correct-horse-battery",
        }))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["user_id"], user_id.to_string());
    assert!(!body["access_token"].as_str().unwrap().is_empty());

    let row: (Option<chrono::DateTime<chrono::Utc>>,) =
        sqlx::query_as("SELECT last_login_at FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(server.pool())
            .await?;
    assert!(row.0.is_some());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_login_failures_are_indistinguishable(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestCallServer::spawn(pool).await?;
    server.register_user("alice@example.com").await?;

    // Wrong password
    let wrong_password = client()
        .post(format!("{}/v1/auth/login", server.url()))
        .json(&json!({
            "email": "alice@example.com",
            "password": "wrong-password-here",
        }))
        .send()
        .await?;

    // Unknown account
    let unknown_account = client()
        .post(format!("{}/v1/auth/login", server.url()))
        .json(&json!({
            "email": "nobody@example.com",
            "password": "wrong-password-here",
        }))
        .send()
        .await?;

    assert_eq!(wrong_password.status(), 401);
    assert_eq!(unknown_account.status(), 401);

    // Same error body for both
    let body_a: serde_json::Value = wrong_password.json().await?;
    let body_b: serde_json::Value = unknown_account.json().await?;
    assert_eq!(body_a, body_b);
    assert_eq!(body_a["error"]["code"], "INVALID_CREDENTIALS");

    Ok(())
}

// ============================================================================
// Session token validation on protected routes
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_protected_route_requires_token(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestCallServer::spawn(pool).await?;

    // Missing Authorization header
    let response = client()
        .get(format!("{}/v1/tokens", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 401);
    assert!(response.headers().contains_key("www-authenticate"));

    // Non-Bearer scheme
    let response = client()
        .get(format!("{}/v1/tokens", server.url()))
        .header("authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;
    assert_eq!(response.status(), 401);

    // Garbage token
    let response = client()
        .get(format!("{}/v1/tokens", server.url()))
        .bearer_auth("not.a.jwt")
        .send()
        .await?;
    assert_eq!(response.status(), 401);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_protected_route_rejects_attack_tokens(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestCallServer::spawn(pool).await?;
    let (user_id, _) = server.register_user("alice@example.com").await?;

    // Server signs with seed 1; the attack tokens reuse the same keypair
    let keypair = TestKeypair::new(1);
    let claims = TestClaims::for_user(user_id, "alice@example.com");

    let cases = vec![
        ("expired", keypair.create_expired_token(user_id, 3600)),
        ("future_iat", keypair.create_future_iat_token(user_id)),
        ("hs256", keypair.create_hs256_token(&claims)),
        ("wrong_key", keypair.create_token_with_wrong_key(&claims)),
        ("tampered", keypair.create_tampered_token(&claims)),
        ("oversized", keypair.create_oversized_token(user_id)),
    ];

    for (name, token) in cases {
        let response = client()
            .get(format!("{}/v1/tokens", server.url()))
            .bearer_auth(&token)
            .send()
            .await?;
        assert_eq!(response.status(), 401, "case '{}' should be rejected", name);

        let body: serde_json::Value = response.json().await?;
        // Generic message for all token failures
        assert_eq!(
            body["error"]["message"], "The access token is invalid or expired",
            "case '{}' should return the generic message",
            name
        );
    }

    // A genuine token still works
    let valid = keypair.sign_token(&claims);
    let response = client()
        .get(format!("{}/v1/tokens", server.url()))
        .bearer_auth(&valid)
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    Ok(())
}
