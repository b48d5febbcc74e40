//! Secret types for signing secrets and bearer tokens.
//!
//! Re-exports [`secrecy`] so every crate in the workspace wraps sensitive
//! values the same way. Both the HMAC signing secrets and issued session
//! tokens are `SecretString`s: their `Debug` output is redacted and the
//! backing memory is zeroized on drop.
//!
//! Reading the value requires an explicit `expose_secret()` call, which keeps
//! every place that touches key material greppable.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct SigningSecrets {
//!     current: SecretString,
//!     previous: Option<SecretString>,
//! }
//!
//! let secrets = SigningSecrets {
//!     current: SecretString::from("3f9a..."),
//!     previous: None,
//! };
//!
//! // Debug output never contains the secret value
//! assert!(!format!("{secrets:?}").contains("3f9a"));
//! assert_eq!(secrets.current.expose_secret(), "3f9a...");
//! ```
//!
//! Use `SecretString` for:
//! - `JWT_SECRET_CURRENT` / `JWT_SECRET_PREVIOUS`
//! - Session tokens held by clients and returned by the renewal endpoint
//!
//! Use `SecretBox<T>` for raw key bytes before they are encoded.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
