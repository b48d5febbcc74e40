//! Integration tests for in-process secret rotation against a live server
//!
//! Rotation demotes the current secret to previous, so tokens issued before
//! it keep working (with the refresh signal) until the next rotation.

use auth_service::services::rotation_service::RotationOutcome;
use auth_test_utils::{TestAuthServer, TokenAssertions, TEST_SECRET_A, TEST_SUBJECT_ID};
use common::secret::ExposeSecret;
use common::session_renewal::REFRESH_SIGNAL_HEADER;
use reqwest::StatusCode;

async fn get_me(server: &TestAuthServer, token: &str) -> Result<reqwest::Response, anyhow::Error> {
    Ok(reqwest::Client::new()
        .get(format!("{}/api/me", server.url()))
        .bearer_auth(token)
        .send()
        .await?)
}

#[tokio::test]
async fn test_token_survives_one_rotation_with_signal() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_A, None)
        .spawn()
        .await?;
    let token = server.sign_token(TEST_SUBJECT_ID)?;

    let before = get_me(&server, &token).await?;
    assert_eq!(before.status(), StatusCode::OK);
    assert!(before.headers().get(REFRESH_SIGNAL_HEADER).is_none());

    let outcome = server.rotate()?;
    assert!(matches!(outcome, RotationOutcome::Rotated { .. }));

    let after = get_me(&server, &token).await?;
    assert_eq!(after.status(), StatusCode::OK);
    assert!(after.headers().get(REFRESH_SIGNAL_HEADER).is_some());

    Ok(())
}

#[tokio::test]
async fn test_token_rejected_after_second_rotation() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_A, None)
        .spawn()
        .await?;
    let token = server.sign_token(TEST_SUBJECT_ID)?;

    server.rotate()?;
    server.rotate()?;

    let response = get_me(&server, &token).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_rotation_demotes_current_and_persists() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_A, None)
        .spawn()
        .await?;

    server.rotate()?;

    let pair = server.secret_pair();
    assert_ne!(pair.current().expose_secret(), TEST_SECRET_A);
    assert_eq!(
        pair.previous().map(|s| s.expose_secret().to_string()),
        Some(TEST_SECRET_A.to_string())
    );

    let persisted = server
        .secrets_file()
        .load()?
        .expect("rotation should write the secrets file");
    assert_eq!(
        persisted.current().expose_secret(),
        pair.current().expose_secret()
    );
    assert_eq!(
        persisted.previous().map(|s| s.expose_secret().to_string()),
        Some(TEST_SECRET_A.to_string())
    );

    Ok(())
}

#[tokio::test]
async fn test_tokens_issued_after_rotation_use_new_secret() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_A, None)
        .spawn()
        .await?;

    server.rotate()?;
    let token = server.sign_token(TEST_SUBJECT_ID)?;

    token
        .assert_valid_jwt()
        .assert_signed_with(&server.current_secret())
        .assert_not_signed_with(TEST_SECRET_A);

    let response = get_me(&server, &token).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(REFRESH_SIGNAL_HEADER).is_none());

    Ok(())
}
