//! Deterministic signing secret fixtures for testing
//!
//! The named secrets mirror a rotation: `A` is the secret in use before a
//! rotation, `B` the one generated by it. `UNKNOWN` is never configured.

/// Secret in use before the rotation.
pub const TEST_SECRET_A: &str = "test-secret-a-0123456789abcdef0123456789abcdef";

/// Secret generated by the rotation.
pub const TEST_SECRET_B: &str = "test-secret-b-fedcba9876543210fedcba9876543210";

/// Secret no server under test is configured with.
pub const TEST_SECRET_UNKNOWN: &str = "test-secret-unknown-not-configured-anywhere";
