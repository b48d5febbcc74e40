use crate::secrets::SecretPair;
use common::config::ObservabilityConfig;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default bind address for the HTTP server.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Default session token lifetime (3 hours).
pub const DEFAULT_TOKEN_LIFETIME_SECONDS: u64 = 3 * 60 * 60;

/// Default `iat` clock skew tolerance in seconds (5 minutes).
pub const DEFAULT_JWT_CLOCK_SKEW_SECONDS: u64 = DEFAULT_CLOCK_SKEW.as_secs();

/// Upper bound for `JWT_CLOCK_SKEW_SECONDS` (10 minutes).
pub const MAX_JWT_CLOCK_SKEW_SECONDS: u64 = MAX_CLOCK_SKEW.as_secs();

/// Default rotation schedule: every Sunday at midnight.
///
/// Day-of-week accepts names or 1-7 with Sunday = 1.
pub const DEFAULT_ROTATION_SCHEDULE: &str = "0 0 * * Sun";

/// Default file that rotation persists the secret pair to.
pub const DEFAULT_SECRETS_FILE: &str = ".env";

/// Deployment posture.
///
/// `Production` is the strict posture: tokens signed with the previous
/// secret are never honored and the rotation scheduler refuses to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posture {
    Production,
    NonProduction,
}

impl Posture {
    /// Parse an `APP_ENV` / `NODE_ENV` value. Only `production` is strict.
    pub fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Posture::Production
        } else {
            Posture::NonProduction
        }
    }

    pub fn is_production(self) -> bool {
        self == Posture::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Posture::Production => "production",
            Posture::NonProduction => "non-production",
        }
    }
}

/// Secret rotation settings.
#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// `ROTATE_JWT_CRON_ENABLE`
    pub enabled: bool,
    /// Cron expression (`JWT_ROTATION_SCHEDULE`), already validated when enabled.
    pub schedule: String,
    /// Env-style file the rotated pair is written to (`JWT_SECRETS_FILE`).
    pub secrets_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub posture: Posture,
    pub jwt_secret_current: SecretString,
    pub jwt_secret_previous: Option<SecretString>,
    pub token_lifetime_seconds: u64,
    pub jwt_clock_skew_seconds: u64,
    pub rotation: RotationConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: JWT_SECRET_CURRENT")]
    MissingCurrentSecret,

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwt_secret_current = vars
            .get("JWT_SECRET_CURRENT")
            .filter(|v| !v.trim().is_empty())
            .map(|v| SecretString::from(v.trim().to_string()))
            .ok_or(ConfigError::MissingCurrentSecret)?;

        let jwt_secret_previous = vars
            .get("JWT_SECRET_PREVIOUS")
            .filter(|v| !v.trim().is_empty())
            .map(|v| SecretString::from(v.trim().to_string()));

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let posture = vars
            .get("APP_ENV")
            .or_else(|| vars.get("NODE_ENV"))
            .map_or(Posture::NonProduction, |v| Posture::from_env_value(v));

        let token_lifetime_seconds = parse_u64(
            vars,
            "JWT_TOKEN_LIFETIME_SECONDS",
            DEFAULT_TOKEN_LIFETIME_SECONDS,
        )?;
        if token_lifetime_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                name: "JWT_TOKEN_LIFETIME_SECONDS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let jwt_clock_skew_seconds = parse_u64(
            vars,
            "JWT_CLOCK_SKEW_SECONDS",
            DEFAULT_JWT_CLOCK_SKEW_SECONDS,
        )?;
        if jwt_clock_skew_seconds > MAX_JWT_CLOCK_SKEW_SECONDS {
            return Err(ConfigError::InvalidValue {
                name: "JWT_CLOCK_SKEW_SECONDS",
                reason: format!(
                    "{} exceeds maximum of {}",
                    jwt_clock_skew_seconds, MAX_JWT_CLOCK_SKEW_SECONDS
                ),
            });
        }

        let enabled = vars
            .get("ROTATE_JWT_CRON_ENABLE")
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"));

        let schedule = vars
            .get("JWT_ROTATION_SCHEDULE")
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_ROTATION_SCHEDULE.to_string());

        if enabled {
            parse_rotation_schedule(&schedule)?;
        }

        let secrets_file = vars
            .get("JWT_SECRETS_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_FILE));

        Ok(Config {
            bind_address,
            posture,
            jwt_secret_current,
            jwt_secret_previous,
            token_lifetime_seconds,
            jwt_clock_skew_seconds,
            rotation: RotationConfig {
                enabled,
                schedule,
                secrets_file,
            },
            observability: ObservabilityConfig::from_vars(vars),
        })
    }

    /// Secret pair as configured through the environment.
    pub fn secret_pair(&self) -> SecretPair {
        SecretPair::new(
            self.jwt_secret_current.clone(),
            self.jwt_secret_previous.clone(),
        )
    }

    pub fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_seconds)
    }
}

fn parse_u64(
    vars: &HashMap<String, String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match vars.get(name) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue {
                name,
                reason: e.to_string(),
            }),
        None => Ok(default),
    }
}

/// Parse a cron expression for the rotation scheduler.
///
/// Standard 5-field expressions (`min hour dom month dow`) are accepted and
/// run at second 0; 6- and 7-field expressions are passed through.
pub fn parse_rotation_schedule(expr: &str) -> Result<cron::Schedule, ConfigError> {
    let fields = expr.split_whitespace().count();
    let normalized = if fields == 5 {
        format!("0 {}", expr.trim())
    } else {
        expr.trim().to_string()
    };

    cron::Schedule::from_str(&normalized).map_err(|e| ConfigError::InvalidValue {
        name: "JWT_ROTATION_SCHEDULE",
        reason: e.to_string(),
    })
}
