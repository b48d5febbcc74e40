//! Integration tests for `POST /api/renovar-token`
//!
//! Scenario A: a token signed with the current secret is renewed and stays
//! valid. Scenario B: a token signed with the previous secret is exchanged
//! for one signed with the current secret.

use auth_test_utils::{
    TestAuthServer, TestTokenBuilder, TokenAssertions, TEST_GARBAGE_TOKEN, TEST_SECRET_A,
    TEST_SECRET_B, TEST_SECRET_UNKNOWN, TEST_SUBJECT_ID,
};
use auth_service::handlers::token_handler::RenewTokenResponse;
use reqwest::StatusCode;
use serde_json::Value;

const GENERIC_MESSAGE: &str = "The access token is invalid or expired";

async fn renew(server: &TestAuthServer, token: &str) -> Result<reqwest::Response, anyhow::Error> {
    Ok(reqwest::Client::new()
        .post(format!("{}/api/renovar-token", server.url()))
        .bearer_auth(token)
        .send()
        .await?)
}

#[tokio::test]
async fn test_renew_current_secret_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let token = TestTokenBuilder::new()
        .for_subject(TEST_SUBJECT_ID)
        .sign_with(TEST_SECRET_B);

    let response = renew(&server, &token).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: RenewTokenResponse = response.json().await?;
    assert!(body.success);
    assert!(!body.was_from_previous_key);
    body.token
        .assert_valid_jwt()
        .assert_for_subject(TEST_SUBJECT_ID)
        .assert_expires_in(server.config().token_lifetime_seconds)
        .assert_signed_with(TEST_SECRET_B);

    Ok(())
}

#[tokio::test]
async fn test_renew_previous_secret_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let old_token = TestTokenBuilder::new()
        .for_subject(TEST_SUBJECT_ID)
        .sign_with(TEST_SECRET_A);

    let response = renew(&server, &old_token).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: RenewTokenResponse = response.json().await?;
    assert!(body.success);
    assert!(body.was_from_previous_key);
    body.token
        .assert_valid_jwt()
        .assert_for_subject(TEST_SUBJECT_ID)
        .assert_signed_with(TEST_SECRET_B)
        .assert_not_signed_with(TEST_SECRET_A);

    // The renewed token no longer triggers the refresh signal
    let me = reqwest::Client::new()
        .get(format!("{}/api/me", server.url()))
        .bearer_auth(&body.token)
        .send()
        .await?;
    assert_eq!(me.status(), StatusCode::OK);
    assert!(me
        .headers()
        .get(common::session_renewal::REFRESH_SIGNAL_HEADER)
        .is_none());

    Ok(())
}

#[tokio::test]
async fn test_renewal_response_is_camel_case() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let old_token = TestTokenBuilder::new().sign_with(TEST_SECRET_A);

    let body: Value = renew(&server, &old_token).await?.json().await?;

    assert!(body["token"].is_string());
    assert_eq!(body["wasFromPreviousKey"], true);
    assert_eq!(body["success"], true);
    assert!(body["message"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_renew_previous_secret_token_in_production() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .production()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let old_token = TestTokenBuilder::new()
        .for_subject(TEST_SUBJECT_ID)
        .sign_with(TEST_SECRET_A);

    let response = renew(&server, &old_token).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: RenewTokenResponse = response.json().await?;
    assert!(body.was_from_previous_key);
    body.token.assert_signed_with(TEST_SECRET_B);

    Ok(())
}

#[tokio::test]
async fn test_renew_garbage_token_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = renew(&server, TEST_GARBAGE_TOKEN).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], GENERIC_MESSAGE);
    assert!(body.get("token").is_none());

    Ok(())
}

#[tokio::test]
async fn test_renew_unknown_secret_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let token = TestTokenBuilder::new().sign_with(TEST_SECRET_UNKNOWN);

    let response = renew(&server, &token).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], GENERIC_MESSAGE);

    Ok(())
}

#[tokio::test]
async fn test_renew_expired_token_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let token = TestTokenBuilder::new()
        .expires_in(-3600)
        .sign_with(TEST_SECRET_A);

    let response = renew(&server, &token).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_renew_without_authorization_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/renovar-token", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], GENERIC_MESSAGE);

    Ok(())
}

#[tokio::test]
async fn test_renew_recently_expired_token_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let token = TestTokenBuilder::new()
        .issued_at(chrono::Utc::now().timestamp() - 3600)
        .expires_in(-30)
        .sign_with(TEST_SECRET_A);

    let response = renew(&server, &token).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], GENERIC_MESSAGE);

    Ok(())
}
