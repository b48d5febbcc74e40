//! Integration tests for the renewal middleware on protected routes
//!
//! Covers the dual-secret acceptance rules and the refresh signal header
//! across both postures.

use auth_test_utils::{
    TestAuthServer, TestTokenBuilder, TEST_GARBAGE_TOKEN, TEST_SECRET_A, TEST_SECRET_B,
    TEST_SECRET_UNKNOWN, TEST_SUBJECT_ID,
};
use common::session_renewal::REFRESH_SIGNAL_HEADER;
use reqwest::StatusCode;
use serde_json::Value;

const GENERIC_MESSAGE: &str = "The access token is invalid or expired";

async fn get_me(server: &TestAuthServer, token: &str) -> Result<reqwest::Response, anyhow::Error> {
    Ok(reqwest::Client::new()
        .get(format!("{}/api/me", server.url()))
        .bearer_auth(token)
        .send()
        .await?)
}

#[tokio::test]
async fn test_current_secret_token_has_no_refresh_signal() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let token = TestTokenBuilder::new()
        .for_subject(TEST_SUBJECT_ID)
        .sign_with(TEST_SECRET_B);

    let response = get_me(&server, &token).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(REFRESH_SIGNAL_HEADER).is_none());

    let body: Value = response.json().await?;
    assert_eq!(body["subjectId"], TEST_SUBJECT_ID);
    assert_eq!(body["fromPreviousKey"], false);

    Ok(())
}

#[tokio::test]
async fn test_previous_secret_token_accepted_with_refresh_signal() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let token = TestTokenBuilder::new()
        .for_subject(TEST_SUBJECT_ID)
        .sign_with(TEST_SECRET_A);

    let response = get_me(&server, &token).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(REFRESH_SIGNAL_HEADER)
            .and_then(|v| v.to_str().ok()),
        Some("true"),
        "Previous-secret tokens must carry the refresh signal"
    );

    let body: Value = response.json().await?;
    assert_eq!(body["subjectId"], TEST_SUBJECT_ID);
    assert_eq!(body["fromPreviousKey"], true);

    Ok(())
}

#[tokio::test]
async fn test_previous_secret_rejected_in_production() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .production()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let token = TestTokenBuilder::new()
        .for_subject(TEST_SUBJECT_ID)
        .sign_with(TEST_SECRET_A);

    let response = get_me(&server, &token).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(REFRESH_SIGNAL_HEADER).is_none());
    let body: Value = response.json().await?;
    assert_eq!(body["error"], GENERIC_MESSAGE);

    Ok(())
}

#[tokio::test]
async fn test_current_secret_accepted_in_production() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .production()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let token = TestTokenBuilder::new()
        .for_subject(TEST_SUBJECT_ID)
        .sign_with(TEST_SECRET_B);

    let response = get_me(&server, &token).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(REFRESH_SIGNAL_HEADER).is_none());

    Ok(())
}

#[tokio::test]
async fn test_unknown_secret_rejected_with_generic_message() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let token = TestTokenBuilder::new().sign_with(TEST_SECRET_UNKNOWN);

    let response = get_me(&server, &token).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get("www-authenticate")
            .and_then(|v| v.to_str().ok()),
        Some("Bearer")
    );
    let body: Value = response.json().await?;
    assert_eq!(body["error"], GENERIC_MESSAGE);

    Ok(())
}

#[tokio::test]
async fn test_expired_token_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let token = TestTokenBuilder::new()
        .expires_in(-3600)
        .sign_with(TEST_SECRET_B);

    let response = get_me(&server, &token).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], GENERIC_MESSAGE);

    Ok(())
}

#[tokio::test]
async fn test_garbage_token_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = get_me(&server, TEST_GARBAGE_TOKEN).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], GENERIC_MESSAGE);

    Ok(())
}

#[tokio::test]
async fn test_missing_authorization_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/me", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_previous_secret_rejected_when_not_configured() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, None)
        .spawn()
        .await?;
    let token = TestTokenBuilder::new().sign_with(TEST_SECRET_A);

    let response = get_me(&server, &token).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
