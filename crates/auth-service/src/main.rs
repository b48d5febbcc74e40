//! Task API server.
//!
//! Loads configuration, restores the signing secret pair (the secrets file
//! wins over the environment, since that is where rotation writes), starts
//! the rotation scheduler when enabled, and serves the HTTP API.

use auth_service::config::Config;
use auth_service::observability::metrics::init_metrics_recorder;
use auth_service::routes::{self, AppState};
use auth_service::secrets::file::SecretFile;
use auth_service::secrets::{SecretPair, SecretStore};
use auth_service::services::rotation_service::Rotator;
use auth_service::services::token_authority::TokenAuthority;
use auth_service::tasks::spawn_rotation_scheduler;
use common::config::{ObservabilityConfig, DEFAULT_LOG_FILTER};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let vars: HashMap<String, String> = std::env::vars().collect();
    init_tracing(&ObservabilityConfig::from_vars(&vars));

    info!("Starting Task API");

    let config = Config::from_vars(&vars).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        posture = config.posture.as_str(),
        token_lifetime_seconds = config.token_lifetime_seconds,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        rotation_enabled = config.rotation.enabled,
        "Configuration loaded successfully"
    );

    let secrets_file = SecretFile::new(&config.rotation.secrets_file);
    let secrets = Arc::new(SecretStore::new(initial_secret_pair(&config, &secrets_file)));

    let authority = Arc::new(TokenAuthority::from_config(&config, secrets.clone()));
    let rotator = Arc::new(Rotator::new(secrets, secrets_file));

    let cancel_token = CancellationToken::new();
    let scheduler_handle = spawn_rotation_scheduler(
        &config.rotation,
        config.posture,
        rotator,
        cancel_token.clone(),
    )?;

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState { authority, config });
    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Task API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await?;

    cancel_token.cancel();
    if let Some(handle) = scheduler_handle {
        if let Err(e) = handle.await {
            warn!("Rotation scheduler did not shut down cleanly: {}", e);
        }
    }

    info!("Task API shutdown complete");

    Ok(())
}

fn init_tracing(observability: &ObservabilityConfig) {
    let filter = EnvFilter::try_new(&observability.log_level)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    if observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Secret pair to start with: the secrets file if it defines a current
/// secret, otherwise the environment.
fn initial_secret_pair(config: &Config, secrets_file: &SecretFile) -> SecretPair {
    match secrets_file.load() {
        Ok(Some(pair)) => {
            info!(
                path = %secrets_file.path().display(),
                previous_set = pair.previous().is_some(),
                "Signing secrets loaded from secrets file"
            );
            pair
        }
        Ok(None) => config.secret_pair(),
        Err(e) => {
            warn!(error = %e, "Could not read secrets file, using environment secrets");
            config.secret_pair()
        }
    }
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    cancel_token.cancel();
}
