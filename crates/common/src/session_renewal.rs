//! Client-side session token renewal.
//!
//! When the server accepts a token that was signed with the previous signing
//! secret it answers normally but adds `X-Token-Refresh-Available: true`.
//! This module reacts to that signal: it exchanges the old token at
//! `POST /api/renovar-token`, stores the new one and republishes it to every
//! subscriber.
//!
//! # Components
//!
//! - [`CredentialStore`] - durable storage for the current token
//!   ([`FileCredentialStore`], [`MemoryCredentialStore`])
//! - [`RenewalCoordinator`] - owns the token, performs renewals, broadcasts
//!   changes through a `tokio::sync::watch` channel
//! - [`SessionClient`] - request interceptor: attaches the bearer token and
//!   triggers a background renewal when a response carries the signal
//!
//! # Guarantees
//!
//! - A refreshed token is published only after `CredentialStore::save`
//!   returned `Ok`. Subscribers never see a token that was not stored first.
//! - A failed renewal is terminal for the session: stored credentials are
//!   cleared and `None` is published, forcing a fresh login.
//! - Overlapping renewal triggers are coalesced: while one renewal is in
//!   flight, further triggers return [`RenewalOutcome::AlreadyInProgress`].
//!
//! # Example
//!
//! ```rust,ignore
//! use common::session_renewal::{
//!     FileCredentialStore, RenewalConfig, RenewalCoordinator, SessionClient,
//! };
//! use std::sync::Arc;
//!
//! let store = Arc::new(FileCredentialStore::new(".task-api-token"));
//! let coordinator = Arc::new(RenewalCoordinator::new(
//!     RenewalConfig::new("https://tasks.example.com".to_string()),
//!     store,
//! )?);
//!
//! let client = SessionClient::new(coordinator.clone());
//! let response = client.send(client.get("/api/me")).await?;
//! ```

use crate::secret::{ExposeSecret, SecretString};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

// =============================================================================
// Constants
// =============================================================================

/// Response header the server sets when a token was accepted under the
/// previous signing secret.
pub const REFRESH_SIGNAL_HEADER: &str = "x-token-refresh-available";

/// Path of the renewal endpoint.
pub const RENEWAL_PATH: &str = "/api/renovar-token";

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout for HTTP client.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during token renewal.
#[derive(Error, Debug, Clone)]
pub enum RenewalError {
    /// There is no token to renew (never logged in, or session already ended).
    #[error("No active session token")]
    NoActiveToken,

    /// HTTP client error.
    #[error("HTTP client error: {0}")]
    HttpError(String),

    /// Renewal rejected by the server (401).
    #[error("Renewal rejected: {0}")]
    Rejected(String),

    /// Renewal response could not be parsed or reported failure.
    #[error("Invalid renewal response: {0}")]
    InvalidResponse(String),

    /// Credential store read/write failed.
    #[error("Credential storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

// =============================================================================
// Credential Storage
// =============================================================================

/// Durable storage for the client's current session token.
pub trait CredentialStore: Send + Sync {
    /// Load the stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns `RenewalError::Storage` if the backing store cannot be read.
    fn load(&self) -> Result<Option<SecretString>, RenewalError>;

    /// Durably store `token`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `RenewalError::Storage` if the token could not be written.
    fn save(&self, token: &SecretString) -> Result<(), RenewalError>;

    /// Remove the stored token.
    ///
    /// # Errors
    ///
    /// Returns `RenewalError::Storage` if the token could not be removed.
    fn clear(&self) -> Result<(), RenewalError>;
}

/// In-memory credential store, for tests and short-lived tools.
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<SecretString>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `token`.
    #[must_use]
    pub fn with_token(token: SecretString) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<SecretString>, RenewalError> {
        let guard = self
            .token
            .lock()
            .map_err(|_| RenewalError::Storage("credential lock poisoned".into()))?;
        Ok(guard.clone())
    }

    fn save(&self, token: &SecretString) -> Result<(), RenewalError> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| RenewalError::Storage("credential lock poisoned".into()))?;
        *guard = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), RenewalError> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| RenewalError::Storage("credential lock poisoned".into()))?;
        *guard = None;
        Ok(())
    }
}

/// File-backed credential store.
///
/// Writes go to a temp file in the same directory which is then renamed over
/// the target, so a crash mid-write never leaves a truncated token behind.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store backed by `path`. The file does not need to exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<SecretString>, RenewalError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(SecretString::from(token.to_string())))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RenewalError::Storage(format!(
                "Failed to read credential file: {e}"
            ))),
        }
    }

    fn save(&self, token: &SecretString) -> Result<(), RenewalError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| RenewalError::Storage(format!("Failed to create temp file: {e}")))?;
        tmp.write_all(token.expose_secret().as_bytes())
            .map_err(|e| RenewalError::Storage(format!("Failed to write temp file: {e}")))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| RenewalError::Storage(format!("Failed to sync temp file: {e}")))?;
        tmp.persist(&self.path)
            .map_err(|e| RenewalError::Storage(format!("Failed to replace credential file: {e}")))?;

        Ok(())
    }

    fn clear(&self) -> Result<(), RenewalError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RenewalError::Storage(format!(
                "Failed to remove credential file: {e}"
            ))),
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the renewal coordinator.
#[derive(Debug, Clone)]
pub struct RenewalConfig {
    /// Task API base URL (e.g., `http://localhost:3000`).
    pub api_endpoint: String,

    /// HTTP request timeout.
    pub http_timeout: Duration,
}

impl RenewalConfig {
    /// Create a new configuration with the default timeout.
    #[must_use]
    pub fn new(api_endpoint: String) -> Self {
        Self {
            api_endpoint: api_endpoint.trim_end_matches('/').to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

// =============================================================================
// Token Receiver
// =============================================================================

/// Subscriber side of the "token refreshed" broadcast.
///
/// `None` means the session ended (renewal failed or credentials cleared).
#[derive(Clone)]
pub struct TokenReceiver(watch::Receiver<Option<SecretString>>);

impl TokenReceiver {
    /// Get the current token, cloned so the channel is never held borrowed.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.0.borrow().clone()
    }

    /// Wait for the token to change.
    ///
    /// # Errors
    ///
    /// Returns `RenewalError::Configuration` if the coordinator was dropped.
    pub async fn changed(&mut self) -> Result<(), RenewalError> {
        self.0
            .changed()
            .await
            .map_err(|_| RenewalError::Configuration("renewal coordinator dropped".into()))
    }
}

impl std::fmt::Debug for TokenReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenReceiver")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Renewal Response
// =============================================================================

/// Renewal endpoint success body.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenewalResponse {
    token: String,
    #[serde(default)]
    was_from_previous_key: bool,
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

impl std::fmt::Debug for RenewalResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenewalResponse")
            .field("token", &"[REDACTED]")
            .field("was_from_previous_key", &self.was_from_previous_key)
            .field("success", &self.success)
            .field("message", &self.message)
            .finish()
    }
}

// =============================================================================
// Renewal Coordinator
// =============================================================================

/// Renewal flow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalState {
    /// No renewal in flight.
    Idle,
    /// A renewal request is in flight.
    Renewing,
}

/// Result of a renewal trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// A new token was stored and published.
    Renewed,
    /// Another renewal was already in flight; this trigger was coalesced.
    AlreadyInProgress,
}

/// Resets the in-flight flag when a renewal finishes, on every exit path.
struct RenewingGuard<'a>(&'a AtomicBool);

impl Drop for RenewingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the client's session token and keeps it fresh across key rotations.
pub struct RenewalCoordinator {
    config: RenewalConfig,
    http_client: reqwest::Client,
    store: Arc<dyn CredentialStore>,
    sender: watch::Sender<Option<SecretString>>,
    renewing: AtomicBool,
}

impl std::fmt::Debug for RenewalCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenewalCoordinator")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl RenewalCoordinator {
    /// Create a coordinator, seeding the current token from `store`.
    ///
    /// # Errors
    ///
    /// - `RenewalError::Configuration` - If the HTTP client cannot be built
    /// - `RenewalError::Storage` - If the stored token cannot be read
    pub fn new(
        config: RenewalConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, RenewalError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                RenewalError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        let initial = store.load()?;
        let (sender, _) = watch::channel(initial);

        Ok(Self {
            config,
            http_client,
            store,
            sender,
            renewing: AtomicBool::new(false),
        })
    }

    /// Install a token obtained from login: store it, then publish it.
    ///
    /// # Errors
    ///
    /// Returns `RenewalError::Storage` if the token could not be stored; in
    /// that case nothing is published.
    pub fn set_token(&self, token: SecretString) -> Result<(), RenewalError> {
        self.store.save(&token)?;
        self.sender.send_replace(Some(token));
        Ok(())
    }

    /// Current token, if a session is active.
    #[must_use]
    pub fn current_token(&self) -> Option<SecretString> {
        self.sender.borrow().clone()
    }

    /// Subscribe to token changes.
    #[must_use]
    pub fn subscribe(&self) -> TokenReceiver {
        TokenReceiver(self.sender.subscribe())
    }

    /// Current renewal flow state.
    #[must_use]
    pub fn state(&self) -> RenewalState {
        if self.renewing.load(Ordering::Acquire) {
            RenewalState::Renewing
        } else {
            RenewalState::Idle
        }
    }

    /// Inspect response headers and start a background renewal if they carry
    /// the refresh signal.
    ///
    /// Returns the renewal task handle when one was spawned. Dropping the
    /// handle does not cancel the renewal.
    pub fn observe(
        self: &Arc<Self>,
        headers: &HeaderMap,
    ) -> Option<JoinHandle<Result<RenewalOutcome, RenewalError>>> {
        if !is_refresh_signal(headers) {
            return None;
        }

        if self.state() == RenewalState::Renewing {
            trace!(
                target: "common.session_renewal",
                "Refresh signal seen while renewal in flight"
            );
            return None;
        }

        debug!(
            target: "common.session_renewal",
            "Refresh signal received, scheduling token renewal"
        );
        Some(self.spawn_renewal())
    }

    /// Run [`RenewalCoordinator::renew`] on the tokio runtime.
    pub fn spawn_renewal(self: &Arc<Self>) -> JoinHandle<Result<RenewalOutcome, RenewalError>> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move { coordinator.renew().await })
    }

    /// Exchange the current token for a freshly signed one.
    ///
    /// Idle -> Renewing -> Idle. On success the new token is stored and then
    /// published. On failure the session is ended.
    ///
    /// # Errors
    ///
    /// Any `RenewalError`; the session has been cleared when this returns `Err`.
    #[instrument(skip_all)]
    pub async fn renew(&self) -> Result<RenewalOutcome, RenewalError> {
        if self
            .renewing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(
                target: "common.session_renewal",
                "Renewal already in progress, coalescing trigger"
            );
            return Ok(RenewalOutcome::AlreadyInProgress);
        }
        let _guard = RenewingGuard(&self.renewing);

        let new_token = match self.exchange_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(
                    target: "common.session_renewal",
                    error = %e,
                    "Token renewal failed, ending session"
                );
                self.end_session();
                return Err(e);
            }
        };

        if let Err(e) = self.store.save(&new_token) {
            warn!(
                target: "common.session_renewal",
                error = %e,
                "Failed to store renewed token, ending session"
            );
            self.end_session();
            return Err(e);
        }

        self.sender.send_replace(Some(new_token));

        info!(
            target: "common.session_renewal",
            "Session token renewed"
        );

        Ok(RenewalOutcome::Renewed)
    }

    /// Clear stored credentials and publish `None`.
    fn end_session(&self) {
        if let Err(e) = self.store.clear() {
            warn!(
                target: "common.session_renewal",
                error = %e,
                "Failed to clear stored credentials"
            );
        }
        self.sender.send_replace(None);
    }

    /// Call the renewal endpoint with the current token.
    async fn exchange_token(&self) -> Result<SecretString, RenewalError> {
        let token = self.current_token().ok_or(RenewalError::NoActiveToken)?;
        let url = format!("{}{}", self.config.api_endpoint, RENEWAL_PATH);

        debug!(
            target: "common.session_renewal",
            url = %url,
            "Requesting token renewal"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                debug!(target: "common.session_renewal", error = %e, "HTTP request failed");
                RenewalError::HttpError(e.to_string())
            })?;

        let status = response.status();

        if status.is_success() {
            let body: RenewalResponse = response.json().await.map_err(|e| {
                warn!(target: "common.session_renewal", error = %e, "Failed to parse renewal response");
                RenewalError::InvalidResponse(e.to_string())
            })?;

            if !body.success || body.token.is_empty() {
                return Err(RenewalError::InvalidResponse(
                    "renewal response reported failure".into(),
                ));
            }

            debug!(
                target: "common.session_renewal",
                was_from_previous_key = body.was_from_previous_key,
                "Renewal response received"
            );

            Ok(SecretString::from(body.token))
        } else if status == reqwest::StatusCode::UNAUTHORIZED {
            // Body is a generic message; keep it out of the error
            let body = response.text().await.unwrap_or_default();
            trace!(
                target: "common.session_renewal",
                body = %body,
                "Renewal rejection response body"
            );
            Err(RenewalError::Rejected(format!("Status {status}")))
        } else if status.is_server_error() {
            warn!(
                target: "common.session_renewal",
                status = %status,
                "Task API returned server error"
            );
            Err(RenewalError::HttpError(format!("Server error: {status}")))
        } else {
            warn!(
                target: "common.session_renewal",
                status = %status,
                "Unexpected renewal response"
            );
            Err(RenewalError::HttpError(format!("Unexpected status: {status}")))
        }
    }
}

/// True if `headers` carry `X-Token-Refresh-Available: true`.
#[must_use]
pub fn is_refresh_signal(headers: &HeaderMap) -> bool {
    headers
        .get(REFRESH_SIGNAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

// =============================================================================
// Session Client
// =============================================================================

/// HTTP client wrapper that authenticates requests with the current session
/// token and reacts to the refresh signal on responses.
#[derive(Debug, Clone)]
pub struct SessionClient {
    coordinator: Arc<RenewalCoordinator>,
}

impl SessionClient {
    /// Wrap a coordinator.
    #[must_use]
    pub fn new(coordinator: Arc<RenewalCoordinator>) -> Self {
        Self { coordinator }
    }

    /// The coordinator backing this client.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<RenewalCoordinator> {
        &self.coordinator
    }

    /// Start a request to `path` (relative to the API endpoint), carrying the
    /// current bearer token if a session is active.
    #[must_use]
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.coordinator.config.api_endpoint, path);
        let builder = self.coordinator.http_client.request(method, url);
        match self.coordinator.current_token() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Shorthand for a GET request.
    #[must_use]
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::GET, path)
    }

    /// Send a request and inspect the response for the refresh signal.
    ///
    /// The renewal (if any) runs in the background; the response is returned
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns `RenewalError::HttpError` if the request itself fails.
    pub async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, RenewalError> {
        let response = request
            .send()
            .await
            .map_err(|e| RenewalError::HttpError(e.to_string()))?;

        let _renewal = self.coordinator.observe(response.headers());

        Ok(response)
    }
}

// =============================================================================
// Tests
// =============================================================================
