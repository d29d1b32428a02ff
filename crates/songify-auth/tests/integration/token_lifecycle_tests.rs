//! Integration tests for token verification over time and tampering

use auth_test_utils::*;
use chrono::Duration;
use reqwest::StatusCode;
use serde_json::{json, Value};
use songify_auth::crypto::SigningAlgorithm;
use std::sync::Arc;

const T: i64 = 1_700_000_000;

async fn get_me(server: &TestAuthServer, token: &str) -> Result<reqwest::Response, anyhow::Error> {
    Ok(reqwest::Client::new()
        .get(format!("{}/me", server.url()))
        .bearer_auth(token)
        .send()
        .await?)
}

async fn assert_invalid_token(response: reqwest::Response) -> Result<(), anyhow::Error> {
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get("www-authenticate").is_some());
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    assert_eq!(body["error"]["message"], "The access token is invalid or expired");
    Ok(())
}

// ============================================================================
// Expiry
// ============================================================================

/// A token issued at T with a one hour window is rejected at T+3601
#[tokio::test]
async fn test_token_expires_after_window() -> Result<(), anyhow::Error> {
    // Arrange
    let clock = Arc::new(ManualClock::at_timestamp(T));
    let server = TestAuthServer::spawn_with_clock(clock.clone()).await?;
    let token = server.login(ALICE_USERNAME, ALICE_PASSWORD).await?;
    token.assert_issued_at(T).assert_lifetime(3600);

    // Still valid just before expiry
    clock.set(T + 3599);
    assert_eq!(get_me(&server, &token).await?.status(), StatusCode::OK);

    // Act
    clock.advance(Duration::seconds(2));

    // Assert
    assert_invalid_token(get_me(&server, &token).await?).await
}

/// Expiry is inclusive: now == exp is already expired
#[tokio::test]
async fn test_token_rejected_at_exact_expiry() -> Result<(), anyhow::Error> {
    let clock = Arc::new(ManualClock::at_timestamp(T));
    let server = TestAuthServer::spawn_with_clock(clock.clone()).await?;
    let token = server.login(BOB_USERNAME, BOB_PASSWORD).await?;

    clock.set(T + 3600);

    assert_invalid_token(get_me(&server, &token).await?).await
}

/// iat too far in the future is rejected, within skew is accepted
#[tokio::test]
async fn test_future_iat_respects_clock_skew() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn_with_clock(Arc::new(ManualClock::at_timestamp(T))).await?;
    let key = test_signing_key(SigningAlgorithm::Rs256);

    let within = TestTokenBuilder::at(T + 60).for_user("bob").sign(&key);
    assert_eq!(get_me(&server, &within).await?.status(), StatusCode::OK);

    let beyond = TestTokenBuilder::at(T + 3000).for_user("bob").sign(&key);
    assert_invalid_token(get_me(&server, &beyond).await?).await
}

// ============================================================================
// Tampering
// ============================================================================

/// One character flipped in the signature segment invalidates the token
#[tokio::test]
async fn test_flipped_signature_character_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let token = server.login(ALICE_USERNAME, ALICE_PASSWORD).await?;

    let signature_start = token.rfind('.').expect("three segments") + 1;
    let flip_at = signature_start + 10;
    let mut bytes = token.clone().into_bytes();
    bytes[flip_at] = if bytes[flip_at] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(bytes)?;
    assert_ne!(tampered, token);

    assert_invalid_token(get_me(&server, &tampered).await?).await
}

/// Editing the payload (e.g. adding ADMIN) breaks the signature
#[tokio::test]
async fn test_payload_escalation_is_rejected() -> Result<(), anyhow::Error> {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let server = TestAuthServer::spawn().await?;
    let token = server.login(BOB_USERNAME, BOB_PASSWORD).await?;
    let parts: Vec<&str> = token.split('.').collect();

    let mut claims: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1])?)?;
    claims["roles"] = json!([ROLE_ADMIN]);
    let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
    let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

    let response = reqwest::Client::new()
        .post(format!("{}/songs", server.url()))
        .bearer_auth(&forged)
        .send()
        .await?;
    assert_invalid_token(response).await
}

/// Tokens signed by an unrelated key are rejected
#[tokio::test]
async fn test_foreign_key_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let token = TestTokenBuilder::at(server.clock().timestamp())
        .for_user(ALICE_USERNAME)
        .with_roles(&[ROLE_ADMIN])
        .sign(&untrusted_signing_key());

    assert_invalid_token(get_me(&server, &token).await?).await
}

/// `alg: none` tokens are never accepted
#[tokio::test]
async fn test_unsigned_token_is_rejected() -> Result<(), anyhow::Error> {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let server = TestAuthServer::spawn().await?;
    let now = server.clock().timestamp();
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(&TestTokenBuilder::at(now).for_user(ALICE_USERNAME).build())?,
    );
    let token = format!("{}.{}.", header, payload);

    assert_invalid_token(get_me(&server, &token).await?).await
}

/// Issuer must match the configured one
#[tokio::test]
async fn test_issuer_mismatch_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let key = test_signing_key(SigningAlgorithm::Rs256);
    let now = server.clock().timestamp();

    let foreign = TestTokenBuilder::at(now).with_issuer("someone-else").sign(&key);
    assert_invalid_token(get_me(&server, &foreign).await?).await?;

    let missing = TestTokenBuilder::at(now).without_issuer().sign(&key);
    assert_invalid_token(get_me(&server, &missing).await?).await
}

/// Unexpected claim shapes fail closed
#[tokio::test]
async fn test_malformed_claims_are_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let key = test_signing_key(SigningAlgorithm::Rs256);
    let now = server.clock().timestamp();

    let cases = [
        TestTokenBuilder::at(now).with_claim("roles", json!("ADMIN")),
        TestTokenBuilder::at(now).with_claim("roles", json!([1, 2])),
        TestTokenBuilder::at(now).with_claim("sub", json!("")),
        TestTokenBuilder::at(now).without_claim("sub"),
        TestTokenBuilder::at(now).with_claim("exp", json!("later")),
        TestTokenBuilder::at(now).expires_in(0),
    ];

    for builder in cases {
        let token = builder.sign(&key);
        assert_invalid_token(get_me(&server, &token).await?).await?;
    }

    Ok(())
}
