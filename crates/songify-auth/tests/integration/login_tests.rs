//! Integration tests for `POST /token`

use auth_test_utils::*;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const T: i64 = 1_700_000_000;

/// alice logs in and gets a token naming her with the ADMIN role
#[tokio::test]
async fn test_login_issues_token_with_subject_and_roles() -> Result<(), anyhow::Error> {
    // Arrange
    let clock = Arc::new(ManualClock::at_timestamp(T));
    let server = TestAuthServer::spawn_with_clock(clock).await?;

    // Act
    let token = server.login(ALICE_USERNAME, ALICE_PASSWORD).await?;

    // Assert
    token
        .assert_valid_jwt()
        .assert_for_subject(ALICE_USERNAME)
        .assert_roles(&[ROLE_ADMIN])
        .assert_issuer(TEST_ISSUER)
        .assert_issued_at(T)
        .assert_lifetime(3600);

    Ok(())
}

/// The token is also set as an http-only cookie lasting the token's lifetime
#[tokio::test]
async fn test_login_sets_access_token_cookie() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server.login_response(BOB_USERNAME, BOB_PASSWORD).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get("set-cookie")
        .expect("login should set a cookie")
        .to_str()?
        .to_string();
    let body: Value = response.json().await?;
    let token = body["token"].as_str().expect("token in body");

    assert!(cookie.starts_with(&format!("accessToken={};", token)));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=3600"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(!cookie.contains("Secure"), "Secure is off by default");

    Ok(())
}

/// Configured lifetime and Secure flag flow through to token and cookie
#[tokio::test]
async fn test_login_honours_expiration_and_secure_cookie() -> Result<(), anyhow::Error> {
    let vars = HashMap::from([
        ("JWT_EXPIRATION_MINUTES".to_string(), "15".to_string()),
        ("AUTH_COOKIE_SECURE".to_string(), "true".to_string()),
    ]);
    let server =
        TestAuthServer::spawn_with(Arc::new(ManualClock::at_timestamp(T)), vars).await?;

    let response = server.login_response(ALICE_USERNAME, ALICE_PASSWORD).await?;
    let cookie = response
        .headers()
        .get("set-cookie")
        .expect("login should set a cookie")
        .to_str()?
        .to_string();
    let body: Value = response.json().await?;

    assert!(cookie.contains("Max-Age=900"));
    assert!(cookie.ends_with("; Secure"));
    body["token"]
        .as_str()
        .expect("token in body")
        .to_string()
        .assert_lifetime(900);

    Ok(())
}

/// Unknown user, wrong password and disabled principal are indistinguishable
#[tokio::test]
async fn test_login_failures_are_uniform() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let attempts = [
        ("nobody", "pw1"),
        (ALICE_USERNAME, "wrong"),
        (ALICE_USERNAME, ""),
        (CAROL_USERNAME, CAROL_PASSWORD),
    ];

    for (username, password) in attempts {
        let response = server.login_response(username, password).await?;

        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "login as {} should fail",
            username
        );
        assert!(response.headers().get("set-cookie").is_none());
        assert!(response.headers().get("www-authenticate").is_some());

        let body: Value = response.json().await?;
        assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
        assert_eq!(body["error"]["message"], "Invalid username or password");
    }

    Ok(())
}

/// A body without a password is rejected before any credential check
#[tokio::test]
async fn test_login_rejects_malformed_body() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::Client::new()
        .post(format!("{}/token", server.url()))
        .json(&json!({ "username": ALICE_USERNAME }))
        .send()
        .await?;

    assert!(response.status().is_client_error());
    assert!(response.headers().get("set-cookie").is_none());

    Ok(())
}

/// EdDSA deployments issue EdDSA tokens that the same server accepts
#[tokio::test]
async fn test_login_with_eddsa_signing() -> Result<(), anyhow::Error> {
    let vars = HashMap::from([("JWT_ALGORITHM".to_string(), "EdDSA".to_string())]);
    let server = TestAuthServer::spawn_with(Arc::new(ManualClock::starting_now()), vars).await?;

    let token = server.login(BOB_USERNAME, BOB_PASSWORD).await?;
    token.assert_algorithm("EdDSA").assert_for_subject(BOB_USERNAME);

    let response = reqwest::Client::new()
        .get(format!("{}/me", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}
