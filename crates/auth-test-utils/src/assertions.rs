//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions for session tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// JWT header structure
#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    #[serde(default)]
    pub typ: Option<String>,
}

/// Session token claims structure
#[derive(Debug, Deserialize)]
struct JwtClaims {
    pub sub: i64,
    pub exp: i64,
    #[expect(dead_code)] // Used for structure validation but not accessed
    pub iat: i64,
}

/// Custom assertions for session tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_for_subject(7)
///     .assert_signed_with(TEST_SECRET_B);
/// ```
pub trait TokenAssertions {
    /// Assert that the token is a well-formed HS256 JWT
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert that the token is for the specified subject
    fn assert_for_subject(&self, subject: i64) -> &Self;

    /// Assert that the token expires within the specified seconds
    fn assert_expires_in(&self, seconds: u64) -> &Self;

    /// Assert that the token signature verifies under `secret`
    fn assert_signed_with(&self, secret: &str) -> &Self;

    /// Assert that the token signature does NOT verify under `secret`
    fn assert_not_signed_with(&self, secret: &str) -> &Self;
}

fn decode_part<T: for<'de> Deserialize<'de>>(token: &str, index: usize, what: &str) -> T {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT is missing its {what}"));
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT {what}: {e:?}"));
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("Failed to parse JWT {what} JSON: {e:?}"))
}

fn signature_verifies(token: &str, secret: &str) -> bool {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    decode::<serde_json::Value>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .is_ok()
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts: Vec<_> = self.split('.').collect();
        assert_eq!(
            parts.len(),
            3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts.len()
        );

        let header: JwtHeader = decode_part(self, 0, "header");
        assert_eq!(header.alg, "HS256", "Expected HS256 algorithm");
        assert_eq!(header.typ.as_deref(), Some("JWT"), "Expected JWT type");

        let _claims: JwtClaims = decode_part(self, 1, "payload");

        self
    }

    fn assert_for_subject(&self, subject: i64) -> &Self {
        let claims: JwtClaims = decode_part(self, 1, "payload");
        assert_eq!(
            claims.sub, subject,
            "Expected subject '{}', got '{}'",
            subject, claims.sub
        );
        self
    }

    fn assert_expires_in(&self, seconds: u64) -> &Self {
        let claims: JwtClaims = decode_part(self, 1, "payload");
        let now = Utc::now().timestamp();
        let remaining = claims.exp - now;
        let expected = seconds as i64;

        // Allow 5 second tolerance for test execution time
        assert!(
            (remaining - expected).abs() <= 5,
            "Expected token to expire in ~{} seconds, but expires in {} seconds",
            expected,
            remaining
        );
        self
    }

    fn assert_signed_with(&self, secret: &str) -> &Self {
        assert!(
            signature_verifies(self, secret),
            "Expected token signature to verify under the given secret"
        );
        self
    }

    fn assert_not_signed_with(&self, secret: &str) -> &Self {
        assert!(
            !signature_verifies(self, secret),
            "Expected token signature NOT to verify under the given secret"
        );
        self
    }
}
