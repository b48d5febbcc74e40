//! Observability for the auth layer.
//!
//! # Privacy by Default
//!
//! All instrumentation uses `#[instrument(skip_all)]` and explicit safe field allow-listing.
//! Fields are categorized as:
//! - **SAFE**: Can be logged in plaintext (outcomes, posture, timestamps)
//! - **HASHED**: Must be SHA-256 hashed for correlation (subject ids, `jti`)
//! - **NEVER**: Must never appear in logs (secrets, tokens)

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars)
///
/// This is NOT cryptographically secure for secrets - it's a one-way hash
/// for correlation purposes only.
pub fn hash_for_correlation(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    // First 4 bytes (8 hex chars)
    hex::encode(result.get(..4).unwrap_or_default())
}
