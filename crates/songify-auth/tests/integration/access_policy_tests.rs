//! Integration tests for policy enforcement on catalog endpoints
//!
//! Catalog reads are public, writes require ADMIN, `/me` and unknown
//! resources require any valid token.

use auth_test_utils::*;
use reqwest::{Method, StatusCode};
use serde_json::Value;

async fn send(
    server: &TestAuthServer,
    method: Method,
    path: &str,
    token: Option<&str>,
) -> Result<reqwest::Response, anyhow::Error> {
    let mut request = reqwest::Client::new().request(method, format!("{}{}", server.url(), path));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    Ok(request.send().await?)
}

// ============================================================================
// Public reads
// ============================================================================

/// No token on a publicly readable operation is allowed
#[tokio::test]
async fn test_public_read_without_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    for path in ["/songs", "/albums", "/artists/1", "/genres"] {
        let response = send(&server, Method::GET, path, None).await?;
        assert_eq!(response.status(), StatusCode::OK, "GET {} should be public", path);
    }

    Ok(())
}

/// A broken token is rejected even where none was needed
#[tokio::test]
async fn test_invalid_token_rejected_on_public_read() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = send(&server, Method::GET, "/songs", Some("not.a.token")).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");

    Ok(())
}

// ============================================================================
// Admin-gated writes
// ============================================================================

/// bob (USER) is forbidden from ADMIN-gated writes
#[tokio::test]
async fn test_user_write_is_forbidden() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let token = server.login(BOB_USERNAME, BOB_PASSWORD).await?;

    for (method, path) in [
        (Method::POST, "/songs"),
        (Method::PUT, "/albums/1"),
        (Method::PATCH, "/artists/1"),
        (Method::DELETE, "/genres/1"),
    ] {
        let response = send(&server, method.clone(), path, Some(&token)).await?;
        assert_eq!(
            response.status(),
            StatusCode::FORBIDDEN,
            "{} {} should be forbidden for USER",
            method,
            path
        );
        assert!(response.headers().get("www-authenticate").is_none());

        let body: Value = response.json().await?;
        assert_eq!(body["error"]["code"], "FORBIDDEN");
        assert_eq!(body["error"]["required_authority"], ROLE_ADMIN);
        assert_eq!(body["error"]["provided_authorities"], serde_json::json!([ROLE_USER]));
    }

    Ok(())
}

/// alice (ADMIN) may write
#[tokio::test]
async fn test_admin_write_is_authorized() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let token = server.login(ALICE_USERNAME, ALICE_PASSWORD).await?;

    let response = send(&server, Method::POST, "/songs", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await?;
    assert_eq!(body["created_by"], ALICE_USERNAME);

    let response = send(&server, Method::DELETE, "/songs/7", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    Ok(())
}

/// Writes with no token are 401, not 403
#[tokio::test]
async fn test_write_without_token_is_unauthenticated() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = send(&server, Method::POST, "/songs", None).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response
        .headers()
        .get("www-authenticate")
        .expect("401 carries a challenge")
        .to_str()?;
    assert!(challenge.starts_with("Bearer"));
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");

    Ok(())
}

// ============================================================================
// Token transport
// ============================================================================

/// The login cookie works in place of the Authorization header
#[tokio::test]
async fn test_cookie_token_is_accepted() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let token = server.login(ALICE_USERNAME, ALICE_PASSWORD).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/songs", server.url()))
        .header("cookie", format!("accessToken={}", token))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::CREATED);

    Ok(())
}

/// A non-Bearer Authorization header is an invalid token
#[tokio::test]
async fn test_basic_auth_header_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::Client::new()
        .get(format!("{}/me", server.url()))
        .basic_auth(ALICE_USERNAME, Some(ALICE_PASSWORD))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");

    Ok(())
}

// ============================================================================
// Authenticated-only resources
// ============================================================================

/// /me echoes the verified context
#[tokio::test]
async fn test_me_returns_context() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let token = server.login(BOB_USERNAME, BOB_PASSWORD).await?;

    let response = send(&server, Method::GET, "/me", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await?;
    assert_eq!(body["subject"], BOB_USERNAME);
    assert_eq!(body["roles"], serde_json::json!([ROLE_USER]));
    assert_eq!(
        body["exp"].as_i64().unwrap() - body["iat"].as_i64().unwrap(),
        3600
    );

    Ok(())
}

/// /me without a token is 401
#[tokio::test]
async fn test_me_requires_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = send(&server, Method::GET, "/me", None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

/// A token with no roles claim authenticates with an empty authority set
#[tokio::test]
async fn test_token_without_roles_has_no_authorities() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let token = TestTokenBuilder::at(server.clock().timestamp())
        .for_user("dave")
        .without_roles()
        .sign(&test_signing_key(server.config().signing_algorithm));

    let me = send(&server, Method::GET, "/me", Some(&token)).await?;
    assert_eq!(me.status(), StatusCode::OK);
    let body: Value = me.json().await?;
    assert_eq!(body["roles"], serde_json::json!([]));

    let write = send(&server, Method::POST, "/songs", Some(&token)).await?;
    assert_eq!(write.status(), StatusCode::FORBIDDEN);

    Ok(())
}
