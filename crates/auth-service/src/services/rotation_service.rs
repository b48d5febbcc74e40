//! Signing secret rotation.
//!
//! A rotation generates a new 256-bit secret, persists the rotated pair to
//! the secrets file and only then swaps it into memory. If persisting fails
//! the in-memory pair is untouched and already-issued tokens keep working.

use crate::crypto;
use crate::observability::metrics::{record_key_rotation, set_key_rotation_last_success};
use crate::secrets::file::{SecretFile, SecretFileError};
use crate::secrets::SecretStore;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum RotationError {
    #[error("Failed to generate signing secret: {0}")]
    Generate(String),

    #[error("Failed to persist rotated secrets: {0}")]
    Persist(#[from] SecretFileError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    Rotated { rotated_at: DateTime<Utc> },
    /// Another rotation was running; nothing was done.
    AlreadyInProgress,
}

/// Single writer for the secret pair.
#[derive(Debug)]
pub struct Rotator {
    secrets: Arc<SecretStore>,
    file: SecretFile,
    in_progress: AtomicBool,
}

/// Clears the in-progress flag on every exit path.
struct InProgressGuard<'a>(&'a AtomicBool);

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Rotator {
    pub fn new(secrets: Arc<SecretStore>, file: SecretFile) -> Self {
        Self {
            secrets,
            file,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn secrets_file(&self) -> &SecretFile {
        &self.file
    }

    /// Rotate the signing secret once.
    ///
    /// Performs blocking file IO; async callers should use `spawn_blocking`.
    #[instrument(skip_all)]
    pub fn rotate(&self) -> Result<RotationOutcome, RotationError> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(target: "auth.rotation", "Rotation already in progress, skipping");
            record_key_rotation("skipped");
            return Ok(RotationOutcome::AlreadyInProgress);
        }
        let _guard = InProgressGuard(&self.in_progress);

        match self.rotate_locked() {
            Ok(rotated_at) => {
                record_key_rotation("success");
                set_key_rotation_last_success(rotated_at.timestamp());
                tracing::info!(
                    target: "auth.rotation",
                    rotated_at = %rotated_at,
                    path = %self.file.path().display(),
                    "Signing secret rotated"
                );
                Ok(RotationOutcome::Rotated { rotated_at })
            }
            Err(e) => {
                record_key_rotation("error");
                tracing::error!(
                    target: "auth.rotation",
                    error = %e,
                    "Signing secret rotation failed, keeping existing secrets"
                );
                Err(e)
            }
        }
    }

    fn rotate_locked(&self) -> Result<DateTime<Utc>, RotationError> {
        let new_secret = crypto::generate_signing_secret()
            .map_err(|e| RotationError::Generate(e.to_string()))?;

        let rotated = self.secrets.snapshot().rotated(new_secret);

        self.file.persist(&rotated)?;
        self.secrets.replace(rotated);

        Ok(Utc::now())
    }
}
