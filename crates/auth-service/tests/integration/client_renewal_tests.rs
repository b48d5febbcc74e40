//! End-to-end tests for the client renewal coordinator against a live server
//!
//! A client holding a token signed with the previous secret calls a
//! protected route, sees the refresh signal, renews in the background and
//! ends up holding a token signed with the current secret.

use auth_test_utils::{
    TestAuthServer, TestTokenBuilder, TokenAssertions, TEST_SECRET_A, TEST_SECRET_B,
    TEST_SECRET_UNKNOWN, TEST_SUBJECT_ID,
};
use common::secret::{ExposeSecret, SecretString};
use common::session_renewal::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, RenewalConfig,
    RenewalCoordinator, RenewalError, RenewalOutcome, SessionClient,
};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

fn coordinator_for(
    server: &TestAuthServer,
    store: Arc<dyn CredentialStore>,
) -> Result<Arc<RenewalCoordinator>, anyhow::Error> {
    Ok(Arc::new(RenewalCoordinator::new(
        RenewalConfig::new(server.url()),
        store,
    )?))
}

#[tokio::test]
async fn test_refresh_signal_triggers_background_renewal() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let old_token = TestTokenBuilder::new()
        .for_subject(TEST_SUBJECT_ID)
        .sign_with(TEST_SECRET_A);

    let store = Arc::new(MemoryCredentialStore::with_token(SecretString::from(
        old_token.clone(),
    )));
    let coordinator = coordinator_for(&server, store.clone())?;
    let mut receiver = coordinator.subscribe();
    let client = SessionClient::new(coordinator.clone());

    let response = client.send(client.get("/api/me")).await?;
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::timeout(Duration::from_secs(5), receiver.changed()).await??;

    let renewed = receiver
        .token()
        .expect("session should still be active")
        .expose_secret()
        .to_string();
    assert_ne!(renewed, old_token);
    renewed
        .assert_for_subject(TEST_SUBJECT_ID)
        .assert_signed_with(TEST_SECRET_B);

    let stored = store.load()?.expect("renewed token should be stored");
    assert_eq!(stored.expose_secret(), renewed);

    // Subsequent requests carry the new token and no longer see the signal
    let response = client.send(client.get("/api/me")).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!common::session_renewal::is_refresh_signal(
        response.headers()
    ));

    Ok(())
}

#[tokio::test]
async fn test_current_token_not_renewed() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let token = TestTokenBuilder::new().sign_with(TEST_SECRET_B);

    let coordinator = coordinator_for(
        &server,
        Arc::new(MemoryCredentialStore::with_token(SecretString::from(
            token.clone(),
        ))),
    )?;
    let client = SessionClient::new(coordinator.clone());

    let response = client.send(client.get("/api/me")).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let current = coordinator.current_token().expect("session active");
    assert_eq!(current.expose_secret(), token);

    Ok(())
}

#[tokio::test]
async fn test_explicit_renew_persists_to_file() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let dir = tempfile::tempdir()?;
    let store = Arc::new(FileCredentialStore::new(dir.path().join("token")));
    let coordinator = coordinator_for(&server, store.clone())?;

    coordinator.set_token(SecretString::from(
        TestTokenBuilder::new().sign_with(TEST_SECRET_A),
    ))?;

    let outcome = coordinator.renew().await?;
    assert_eq!(outcome, RenewalOutcome::Renewed);

    let stored = store.load()?.expect("token file should exist");
    stored
        .expose_secret()
        .to_string()
        .assert_signed_with(TEST_SECRET_B);

    Ok(())
}

#[tokio::test]
async fn test_rejected_renewal_ends_session() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
        .spawn()
        .await?;
    let store = Arc::new(MemoryCredentialStore::with_token(SecretString::from(
        TestTokenBuilder::new().sign_with(TEST_SECRET_UNKNOWN),
    )));
    let coordinator = coordinator_for(&server, store.clone())?;

    let result = coordinator.renew().await;

    assert!(matches!(result, Err(RenewalError::Rejected(_))));
    assert!(coordinator.current_token().is_none());
    assert!(store.load()?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_client_follows_server_rotation() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::builder()
        .with_secrets(TEST_SECRET_A, None)
        .spawn()
        .await?;
    let token = server.sign_token(TEST_SUBJECT_ID)?;

    let coordinator = coordinator_for(
        &server,
        Arc::new(MemoryCredentialStore::with_token(SecretString::from(token))),
    )?;
    let mut receiver = coordinator.subscribe();
    let client = SessionClient::new(coordinator.clone());

    server.rotate()?;

    let response = client.send(client.get("/api/me")).await?;
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::timeout(Duration::from_secs(5), receiver.changed()).await??;

    let renewed = receiver.token().expect("session active");
    renewed
        .expose_secret()
        .to_string()
        .assert_signed_with(&server.current_secret())
        .assert_not_signed_with(TEST_SECRET_A);

    // A second rotation retires the original secret; the renewed token survives
    server.rotate()?;
    let response = client.send(client.get("/api/me")).await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}
