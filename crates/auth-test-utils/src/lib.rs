//! # Auth Test Utilities
//!
//! Shared test utilities for the task API session-token service.
//!
//! This crate provides:
//! - Deterministic signing secret fixtures
//! - Test data builders (TestTokenBuilder)
//! - Server test harness (TestAuthServer for E2E tests)
//! - Fixed test IDs (subjects)
//! - Custom assertions (TokenAssertions trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let server = TestAuthServer::builder()
//!         .with_secrets(TEST_SECRET_B, Some(TEST_SECRET_A))
//!         .spawn()
//!         .await?;
//!
//!     let old_token = TestTokenBuilder::new()
//!         .for_subject(TEST_SUBJECT_ID)
//!         .sign_with(TEST_SECRET_A);
//!
//!     old_token
//!         .assert_valid_jwt()
//!         .assert_for_subject(TEST_SUBJECT_ID)
//!         .assert_signed_with(TEST_SECRET_A);
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
