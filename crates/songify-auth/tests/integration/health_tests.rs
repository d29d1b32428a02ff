//! Integration tests for operational endpoints

use auth_test_utils::*;
use reqwest::StatusCode;

/// /health returns 200 OK with no token
#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestAuthServer::spawn().await?;

    // Act
    let response = reqwest::Client::new()
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK, "Health check should return 200 OK");
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

/// /metrics is public and reflects login attempts
#[tokio::test]
async fn test_metrics_endpoint_reports_logins() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server.login(ALICE_USERNAME, ALICE_PASSWORD).await?;

    let response = reqwest::Client::new()
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await?;
    assert!(
        body.contains("songify_auth_login_total"),
        "metrics output should include login counter, got:\n{}",
        body
    );
    assert!(
        !body.contains(ALICE_USERNAME),
        "metrics must not carry usernames"
    );

    Ok(())
}
