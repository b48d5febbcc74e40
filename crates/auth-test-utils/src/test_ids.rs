//! Fixed test IDs for deterministic tests
//!
//! All test IDs are deterministic to ensure reproducible test results.

/// Subject used by the rotation scenarios.
pub const TEST_SUBJECT_ID: i64 = 7;

/// A bearer value that is not a compact token at all.
pub const TEST_GARBAGE_TOKEN: &str = "not-a-token";
