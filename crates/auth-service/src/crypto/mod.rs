use crate::errors::{AuthError, TokenError};
use common::jwt::{check_token_shape, validate_iat};
use common::secret::{ExposeSecret, SecretString};
use common::types::SubjectId;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::instrument;

/// Size of a generated signing secret in bytes (256 bits).
pub const SIGNING_SECRET_BYTES: usize = 32;

/// Session token claims.
///
/// `sub` identifies the user and `jti` identifies the individual token;
/// both are redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: SubjectId,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl fmt::Debug for SessionClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClaims")
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("jti", &"[REDACTED]")
            .finish()
    }
}

/// Sign session claims with an HMAC-SHA256 secret.
#[instrument(skip_all)]
pub fn sign_token(claims: &SessionClaims, secret: &SecretString) -> Result<String, AuthError> {
    let encoding_key = EncodingKey::from_secret(secret.expose_secret().as_bytes());

    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".to_string());

    encode(&header, claims, &encoding_key)
        .map_err(|e| AuthError::Crypto(format!("JWT signing operation failed: {}", e)))
}

/// Verify a session token against a single HMAC secret.
///
/// Validates:
/// - Shape and size (before any HMAC work)
/// - Signature (HS256 only; other `alg` values are rejected)
/// - Expiration (`exp`)
/// - Issued-at (`iat`) no further than `clock_skew` in the future
#[instrument(skip_all)]
pub fn verify_token(
    token: &str,
    secret: &SecretString,
    clock_skew: Duration,
) -> Result<SessionClaims, TokenError> {
    check_token_shape(token)?;

    let decoding_key = DecodingKey::from_secret(secret.expose_secret().as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    // Skew is tolerated on `iat` only; `exp` is exact
    validation.leeway = 0;

    let token_data = decode::<SessionClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "auth.crypto", error = %e, "Token verification failed");
        TokenError::InvalidOrExpired
    })?;

    validate_iat(token_data.claims.iat, clock_skew)?;

    Ok(token_data.claims)
}

/// Generate cryptographically secure random bytes
pub fn generate_random_bytes(len: usize) -> Result<Vec<u8>, AuthError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|e| AuthError::Crypto(format!("Random bytes generation failed: {}", e)))?;
    Ok(bytes)
}

/// Generate a fresh signing secret (32 bytes, hex encoded).
///
/// Hex keeps the value safe to write into an env-style file unquoted.
#[instrument(skip_all)]
pub fn generate_signing_secret() -> Result<SecretString, AuthError> {
    let bytes = generate_random_bytes(SIGNING_SECRET_BYTES)?;
    Ok(SecretString::from(hex::encode(bytes)))
}
