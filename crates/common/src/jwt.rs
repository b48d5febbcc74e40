//! Compact session-token helpers shared by the server and its clients.
//!
//! This module provides:
//! - Size limits for DoS prevention
//! - Structural shape checks (`header.payload.signature`)
//! - Unverified payload decoding for diagnostics
//! - Clock skew constants and `iat` validation
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Shape checks run BEFORE any cryptographic work, so a malformed token
//!   never reaches HMAC verification
//! - Unverified decoding must never drive an authorization decision
//! - Error messages are generic to prevent information leakage

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed token size in bytes (8KB).
///
/// Session tokens are ~200 bytes (HS256 signature, four claims). Anything
/// larger than this is rejected before base64 decoding.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default clock skew tolerance for `iat` (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Number of dot-separated segments in a compact token.
const TOKEN_SEGMENTS: usize = 3;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a token without its key.
///
/// All variants share one message so callers cannot be used as an oracle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token is not a three-segment base64url compact token, or a segment
    /// does not decode to the expected JSON.
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Functions
// =============================================================================

/// Check that a token has the compact `header.payload.signature` shape.
///
/// Rejects oversized input, anything with fewer or more than three segments,
/// and empty segments. No base64 decoding or signature work happens here.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong segment count or an empty segment
pub fn check_token_shape(token: &str) -> Result<(), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != TOKEN_SEGMENTS || segments.iter().any(|s| s.is_empty()) {
        tracing::debug!(
            target: "common.jwt",
            segments = segments.len(),
            "Token rejected: invalid compact token format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    Ok(())
}

/// Decode the payload segment of a token WITHOUT verifying its signature.
///
/// Intended for diagnostics (e.g. reading `exp` to log how long a rejected
/// token had left). Never use the result for authorization.
///
/// # Errors
///
/// Returns `TokenTooLarge` or `MalformedToken` if the shape check fails, the
/// payload is not base64url, or it does not deserialize into `T`.
pub fn decode_payload_unverified<T: DeserializeOwned>(
    token: &str,
) -> Result<T, JwtValidationError> {
    check_token_shape(token)?;

    let payload_part = token
        .split('.')
        .nth(1)
        .ok_or(JwtValidationError::MalformedToken)?;

    let payload_bytes = URL_SAFE_NO_PAD.decode(payload_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode token payload base64");
        JwtValidationError::MalformedToken
    })?;

    serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse token payload JSON");
        JwtValidationError::MalformedToken
    })
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat` is more than
/// `clock_skew` ahead of the current time.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // clock_skew is bounded to MAX_CLOCK_SKEW by configuration
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
