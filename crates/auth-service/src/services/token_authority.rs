//! Token Authority: signs and verifies session tokens under the dual-secret
//! policy.
//!
//! Tokens are always signed with the current secret. Verification tries the
//! current secret first and, outside production, falls back to the previous
//! one. Which secret matched is reported through [`Verification`] so the
//! middleware can tell the client to renew.

use crate::config::{Config, Posture};
use crate::crypto::{self, SessionClaims};
use crate::errors::{AuthError, TokenError};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::{record_token_issuance, record_token_validation};
use crate::secrets::SecretStore;
use common::jwt::{check_token_shape, decode_payload_unverified};
use common::types::SubjectId;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Per-call overrides for [`TokenAuthority::sign`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SignOptions {
    /// Lifetime of the token. `None` uses the configured default.
    pub expires_in: Option<Duration>,
}

/// Successful verification, tagged with the secret that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Current(SessionClaims),
    Previous(SessionClaims),
}

impl Verification {
    pub fn claims(&self) -> &SessionClaims {
        match self {
            Verification::Current(claims) | Verification::Previous(claims) => claims,
        }
    }

    pub fn subject_id(&self) -> SubjectId {
        self.claims().sub
    }

    pub fn from_previous_secret(&self) -> bool {
        matches!(self, Verification::Previous(_))
    }
}

/// Diagnostic view of the secret pair. Never contains secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationStatus {
    pub current_key_set: bool,
    pub previous_key_set: bool,
    pub message: String,
}

/// A token re-issued under the current secret.
#[derive(Debug, Clone)]
pub struct Renewal {
    pub token: String,
    pub subject_id: SubjectId,
    pub was_from_previous_key: bool,
}

#[derive(Debug)]
pub struct TokenAuthority {
    secrets: Arc<SecretStore>,
    posture: Posture,
    token_lifetime: Duration,
    clock_skew: Duration,
}

impl TokenAuthority {
    pub fn new(
        secrets: Arc<SecretStore>,
        posture: Posture,
        token_lifetime: Duration,
        clock_skew: Duration,
    ) -> Self {
        Self {
            secrets,
            posture,
            token_lifetime,
            clock_skew,
        }
    }

    /// Build an authority for `config` over an already-populated store.
    pub fn from_config(config: &Config, secrets: Arc<SecretStore>) -> Self {
        Self::new(
            secrets,
            config.posture,
            config.token_lifetime(),
            Duration::from_secs(config.jwt_clock_skew_seconds),
        )
    }

    pub fn posture(&self) -> Posture {
        self.posture
    }

    pub fn secrets(&self) -> &Arc<SecretStore> {
        &self.secrets
    }

    /// Sign a new token for `subject` with the current secret.
    #[instrument(skip_all)]
    pub fn sign(&self, subject: SubjectId, options: SignOptions) -> Result<String, AuthError> {
        self.issue(subject, options, "sign")
    }

    fn issue(
        &self,
        subject: SubjectId,
        options: SignOptions,
        kind: &'static str,
    ) -> Result<String, AuthError> {
        let lifetime = options.expires_in.unwrap_or(self.token_lifetime);
        let lifetime_secs = i64::try_from(lifetime.as_secs()).map_err(|_| AuthError::Internal)?;

        let now = chrono::Utc::now().timestamp();
        let claims = SessionClaims {
            sub: subject,
            iat: now,
            exp: now.saturating_add(lifetime_secs),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let pair = self.secrets.snapshot();
        let token = crypto::sign_token(&claims, pair.current())?;

        record_token_issuance(kind);
        tracing::debug!(
            target: "auth.crypto",
            subject = %hash_for_correlation(&subject.to_string()),
            kind,
            expires_at = claims.exp,
            "Session token signed"
        );

        Ok(token)
    }

    /// Verify a token under the posture's policy.
    ///
    /// In production only the current secret is accepted.
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str) -> Result<Verification, TokenError> {
        self.verify_with_policy(token, !self.posture.is_production())
    }

    /// Verify a token for the renewal endpoint.
    ///
    /// The previous secret is accepted regardless of posture, so a client
    /// holding a pre-rotation token can always exchange it.
    #[instrument(skip_all)]
    pub fn verify_for_renewal(&self, token: &str) -> Result<Verification, TokenError> {
        self.verify_with_policy(token, true)
    }

    fn verify_with_policy(
        &self,
        token: &str,
        allow_previous: bool,
    ) -> Result<Verification, TokenError> {
        if let Err(e) = check_token_shape(token) {
            record_token_validation("rejected");
            return Err(e.into());
        }

        // One snapshot for both attempts
        let pair = self.secrets.snapshot();

        let current_err = match crypto::verify_token(token, pair.current(), self.clock_skew) {
            Ok(claims) => {
                record_token_validation("current");
                return Ok(Verification::Current(claims));
            }
            Err(e) => e,
        };

        let previous = match (allow_previous, pair.previous()) {
            (true, Some(previous)) => previous,
            _ => {
                tracing::debug!(
                    target: "auth.crypto",
                    allow_previous,
                    previous_set = pair.previous().is_some(),
                    "Token rejected under current secret"
                );
                record_token_validation("rejected");
                return Err(current_err);
            }
        };

        match crypto::verify_token(token, previous, self.clock_skew) {
            Ok(claims) => {
                tracing::debug!(
                    target: "auth.crypto",
                    subject = %hash_for_correlation(&claims.sub.to_string()),
                    "Token accepted under previous secret"
                );
                record_token_validation("previous");
                Ok(Verification::Previous(claims))
            }
            Err(e) => {
                tracing::debug!(target: "auth.crypto", "Token rejected under both secrets");
                record_token_validation("rejected");
                Err(e)
            }
        }
    }

    /// Exchange a token accepted by [`verify_for_renewal`](Self::verify_for_renewal)
    /// for a fresh one under the current secret, same subject.
    #[instrument(skip_all)]
    pub fn renew(&self, token: &str) -> Result<Renewal, AuthError> {
        let verification = self.verify_for_renewal(token)?;
        let subject_id = verification.subject_id();
        let new_token = self.issue(subject_id, SignOptions::default(), "renewal")?;

        Ok(Renewal {
            token: new_token,
            subject_id,
            was_from_previous_key: verification.from_previous_secret(),
        })
    }

    /// Read the claims of a token WITHOUT verifying it. Diagnostics only.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, TokenError> {
        Ok(decode_payload_unverified(token)?)
    }

    pub fn rotation_status(&self) -> RotationStatus {
        let pair = self.secrets.snapshot();
        let previous_key_set = pair.previous().is_some();

        let message = if previous_key_set {
            "Rotation window open: tokens signed with the previous secret are accepted and flagged for renewal"
        } else {
            "No rotation window: only tokens signed with the current secret are accepted"
        };

        RotationStatus {
            current_key_set: true,
            previous_key_set,
            message: message.to_string(),
        }
    }
}
