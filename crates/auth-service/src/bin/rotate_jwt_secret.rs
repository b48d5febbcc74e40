//! Operator command: rotate the signing secret once.
//!
//! Reads the same configuration as the server, demotes the current secret
//! to `JWT_SECRET_PREVIOUS`, writes a freshly generated current secret to
//! the secrets file, and exits. Running servers pick up the new pair on
//! restart. Refuses to run in a production posture.

use anyhow::{bail, Context};
use auth_service::config::Config;
use auth_service::secrets::file::SecretFile;
use auth_service::secrets::SecretStore;
use auth_service::services::rotation_service::{RotationOutcome, Rotator};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "auth_service=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    if config.posture.is_production() {
        bail!("Refusing to rotate signing secrets in a production posture");
    }

    let secrets_file = SecretFile::new(&config.rotation.secrets_file);
    let pair = secrets_file
        .load()
        .context("Failed to read secrets file")?
        .unwrap_or_else(|| config.secret_pair());

    let rotator = Rotator::new(Arc::new(SecretStore::new(pair)), secrets_file);

    match rotator.rotate().context("Rotation failed")? {
        RotationOutcome::Rotated { rotated_at } => {
            info!(
                rotated_at = %rotated_at,
                path = %rotator.secrets_file().path().display(),
                "Signing secret rotated; restart the server to load it"
            );
        }
        RotationOutcome::AlreadyInProgress => {
            info!("Rotation already in progress, nothing to do");
        }
    }

    Ok(())
}
