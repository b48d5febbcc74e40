//! Test server harness for E2E testing
//!
//! Provides TestAuthServer for spawning real task API instances in tests.
//! Each instance owns a temporary secrets file so rotations never touch the
//! developer's `.env`.

use crate::crypto_fixtures::TEST_SECRET_A;
use auth_service::config::{Config, Posture};
use auth_service::observability::metrics::init_metrics_recorder;
use auth_service::routes::{self, AppState};
use auth_service::secrets::file::SecretFile;
use auth_service::secrets::{SecretPair, SecretStore};
use auth_service::services::rotation_service::{RotationOutcome, Rotator};
use auth_service::services::token_authority::{SignOptions, TokenAuthority};
use common::secret::ExposeSecret;
use common::types::SubjectId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// Builder for [`TestAuthServer`]
///
/// Defaults: non-production posture, current secret `TEST_SECRET_A`, no
/// previous secret.
pub struct TestAuthServerBuilder {
    posture: Posture,
    current: String,
    previous: Option<String>,
}

impl TestAuthServerBuilder {
    /// Run the server in the production posture
    pub fn production(mut self) -> Self {
        self.posture = Posture::Production;
        self
    }

    /// Configure the secret pair
    pub fn with_secrets(mut self, current: &str, previous: Option<&str>) -> Self {
        self.current = current.to_string();
        self.previous = previous.map(str::to_string);
        self
    }

    /// Spawn the server
    pub async fn spawn(self) -> Result<TestAuthServer, anyhow::Error> {
        TestAuthServer::spawn_with(self).await
    }
}

/// Test harness for spawning the task API in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_renewal_e2e() -> Result<()> {
///     let server = TestAuthServer::builder()
///         .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
///         .spawn()
///         .await?;
///
///     let response = reqwest::Client::new()
///         .post(format!("{}/api/renovar-token", server.url()))
///         .bearer_auth(&old_token)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestAuthServer {
    addr: SocketAddr,
    config: Config,
    authority: Arc<TokenAuthority>,
    rotator: Rotator,
    _secrets_dir: TempDir,
    handle: JoinHandle<()>,
}

impl TestAuthServer {
    /// Start building a server
    pub fn builder() -> TestAuthServerBuilder {
        TestAuthServerBuilder {
            posture: Posture::NonProduction,
            current: TEST_SECRET_A.to_string(),
            previous: None,
        }
    }

    /// Spawn a non-production server with the default secret pair
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::builder().spawn().await
    }

    async fn spawn_with(builder: TestAuthServerBuilder) -> Result<Self, anyhow::Error> {
        let secrets_dir = tempfile::tempdir()
            .map_err(|e| anyhow::anyhow!("Failed to create secrets dir: {}", e))?;
        let secrets_path = secrets_dir.path().join(".env");

        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("APP_ENV".to_string(), builder.posture.as_str().to_string()),
            ("JWT_SECRET_CURRENT".to_string(), builder.current),
            (
                "JWT_SECRETS_FILE".to_string(),
                secrets_path.display().to_string(),
            ),
        ]);
        if let Some(previous) = builder.previous {
            vars.insert("JWT_SECRET_PREVIOUS".to_string(), previous);
        }
        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Invalid test configuration: {}", e))?;

        let secrets = Arc::new(SecretStore::new(config.secret_pair()));
        let authority = Arc::new(TokenAuthority::from_config(&config, secrets.clone()));
        let rotator = Rotator::new(secrets, SecretFile::new(&secrets_path));

        // Initialize metrics recorder for test server
        // Note: This may fail if already installed in the test process.
        // In that case, we create a new recorder without installing it globally.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                let recorder = PrometheusBuilder::new().build_recorder();
                recorder.handle()
            }
        };

        let state = Arc::new(AppState {
            authority: authority.clone(),
            config: config.clone(),
        });
        let app = routes::build_routes(state, metrics_handle);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            authority,
            rotator,
            _secrets_dir: secrets_dir,
            handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get reference to the server configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sign a token for `subject` with the server's current secret
    pub fn sign_token(&self, subject: i64) -> Result<String, anyhow::Error> {
        self.authority
            .sign(SubjectId(subject), SignOptions::default())
            .map_err(|e| anyhow::anyhow!("Failed to sign test token: {}", e))
    }

    /// Rotate the server's secrets in place, as the scheduler would
    pub fn rotate(&self) -> Result<RotationOutcome, anyhow::Error> {
        self.rotator
            .rotate()
            .map_err(|e| anyhow::anyhow!("Rotation failed: {}", e))
    }

    /// Current secret pair held in memory
    pub fn secret_pair(&self) -> Arc<SecretPair> {
        self.authority.secrets().snapshot()
    }

    /// Current signing secret as plain text
    pub fn current_secret(&self) -> String {
        self.secret_pair().current().expose_secret().to_string()
    }

    /// The secrets file rotations write to
    pub fn secrets_file(&self) -> &SecretFile {
        self.rotator.secrets_file()
    }
}

impl Drop for TestAuthServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
