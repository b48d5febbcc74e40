//! Builder patterns for test data construction
//!
//! Provides fluent APIs for creating session tokens signed with arbitrary
//! secrets, independent of any running server.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;

use crate::test_ids::TEST_SUBJECT_ID;

/// Builder for creating test session tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_subject(7)
///     .expires_in(3600)
///     .sign_with(TEST_SECRET_A);
/// ```
pub struct TestTokenBuilder {
    sub: i64,
    exp: i64,
    iat: i64,
    jti: String,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: TEST_SUBJECT_ID,
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Set the subject
    pub fn for_subject(mut self, subject: i64) -> Self {
        self.sub = subject;
        self
    }

    /// Set expiration in seconds from now (negative for an expired token)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> serde_json::Value {
        json!({
            "sub": self.sub,
            "iat": self.iat,
            "exp": self.exp,
            "jti": self.jti,
        })
    }

    /// Sign the claims with HS256 under `secret`
    pub fn sign_with(self, secret: &str) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        encode(
            &header,
            &self.build(),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("HS256 signing of test claims should not fail")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
