//! Integration tests for `GET /api/jwt-status`

use auth_test_utils::{TestAuthServer, TEST_SECRET_A, TEST_SECRET_B};
use reqwest::StatusCode;
use serde_json::Value;

async fn jwt_status(server: &TestAuthServer) -> Result<reqwest::Response, anyhow::Error> {
    Ok(reqwest::Client::new()
        .get(format!("{}/api/jwt-status", server.url()))
        .send()
        .await?)
}

#[tokio::test]
async fn test_status_without_previous_secret() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_A, None)
        .spawn()
        .await?;

    let response = jwt_status(&server).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await?;
    assert_eq!(body["currentKeySet"], true);
    assert_eq!(body["previousKeySet"], false);
    assert!(body["message"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_status_with_previous_secret() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;

    let body: Value = jwt_status(&server).await?.json().await?;
    assert_eq!(body["currentKeySet"], true);
    assert_eq!(body["previousKeySet"], true);

    Ok(())
}

#[tokio::test]
async fn test_status_never_leaks_secret_material() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;

    let body = jwt_status(&server).await?.text().await?;
    assert!(!body.contains(TEST_SECRET_A));
    assert!(!body.contains(TEST_SECRET_B));

    Ok(())
}

#[tokio::test]
async fn test_status_not_available_in_production() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .production()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;

    let response = jwt_status(&server).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_status_reflects_rotation() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_A, None)
        .spawn()
        .await?;

    server.rotate()?;

    let body: Value = jwt_status(&server).await?.json().await?;
    assert_eq!(body["previousKeySet"], true);

    Ok(())
}
