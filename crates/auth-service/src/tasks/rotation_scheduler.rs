//! Rotation scheduler background task.
//!
//! Sleeps until the next cron occurrence, rotates the signing secret, and
//! repeats. Runs only when `ROTATE_JWT_CRON_ENABLE` is set and never in a
//! production posture.
//!
//! # Graceful Shutdown
//!
//! The task exits when its cancellation token is triggered. A rotation that
//! has already started runs to completion on the blocking pool.

use crate::config::{parse_rotation_schedule, ConfigError, Posture, RotationConfig};
use crate::services::rotation_service::{RotationOutcome, Rotator};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerDecision {
    Disabled,
    RefusedInProduction,
    Enabled,
}

pub fn scheduler_decision(enabled: bool, posture: Posture) -> SchedulerDecision {
    match (enabled, posture) {
        (false, _) => SchedulerDecision::Disabled,
        (true, Posture::Production) => SchedulerDecision::RefusedInProduction,
        (true, Posture::NonProduction) => SchedulerDecision::Enabled,
    }
}

/// Spawn the scheduler if configuration and posture allow it.
///
/// Returns `Ok(None)` when the scheduler is disabled or refused.
pub fn spawn_rotation_scheduler(
    config: &RotationConfig,
    posture: Posture,
    rotator: Arc<Rotator>,
    cancel_token: CancellationToken,
) -> Result<Option<JoinHandle<()>>, ConfigError> {
    match scheduler_decision(config.enabled, posture) {
        SchedulerDecision::Disabled => {
            info!(target: "auth.rotation", "Rotation scheduler disabled");
            Ok(None)
        }
        SchedulerDecision::RefusedInProduction => {
            warn!(
                target: "auth.rotation",
                "ROTATE_JWT_CRON_ENABLE is set but the service runs in production; automatic rotation refused"
            );
            Ok(None)
        }
        SchedulerDecision::Enabled => {
            let schedule = parse_rotation_schedule(&config.schedule)?;
            info!(
                target: "auth.rotation",
                schedule = %config.schedule,
                path = %config.secrets_file.display(),
                "Rotation scheduler starting"
            );
            let handle = tokio::spawn(
                run_rotation_scheduler(rotator, schedule, cancel_token)
                    .instrument(tracing::info_span!("auth.rotation.scheduler")),
            );
            Ok(Some(handle))
        }
    }
}

/// Run the scheduler loop until cancelled or the schedule has no more
/// occurrences.
pub async fn run_rotation_scheduler(
    rotator: Arc<Rotator>,
    schedule: cron::Schedule,
    cancel_token: CancellationToken,
) {
    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            warn!(target: "auth.rotation", "Rotation schedule has no upcoming occurrences, exiting");
            break;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            () = tokio::time::sleep(wait) => {
                let rotator = Arc::clone(&rotator);
                match tokio::task::spawn_blocking(move || rotator.rotate()).await {
                    Ok(Ok(RotationOutcome::Rotated { rotated_at })) => {
                        info!(target: "auth.rotation", rotated_at = %rotated_at, "Scheduled rotation complete");
                    }
                    Ok(Ok(RotationOutcome::AlreadyInProgress)) => {}
                    // Already logged and counted by the rotator
                    Ok(Err(_)) => {}
                    Err(e) => {
                        tracing::error!(target: "auth.rotation", error = %e, "Rotation task panicked");
                    }
                }
            }
            () = cancel_token.cancelled() => {
                info!(target: "auth.rotation", "Rotation scheduler received shutdown signal, exiting");
                break;
            }
        }
    }
}
