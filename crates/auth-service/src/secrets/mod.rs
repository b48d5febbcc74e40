//! Signing secret pair and its process-wide store.
//!
//! The pair is read on every sign/verify and written only by rotation.
//! [`SecretStore`] keeps it behind an [`ArcSwap`]: readers take an
//! `Arc<SecretPair>` snapshot and use it for the whole operation, so a
//! concurrent rotation can never produce a torn read (new current with a
//! stale previous, or the reverse).

pub mod file;

use arc_swap::ArcSwap;
use common::secret::SecretString;
use std::sync::Arc;

/// Current signing secret plus, during a rotation window, the one it replaced.
#[derive(Debug, Clone)]
pub struct SecretPair {
    current: SecretString,
    previous: Option<SecretString>,
}

impl SecretPair {
    pub fn new(current: SecretString, previous: Option<SecretString>) -> Self {
        Self { current, previous }
    }

    pub fn current(&self) -> &SecretString {
        &self.current
    }

    pub fn previous(&self) -> Option<&SecretString> {
        self.previous.as_ref()
    }

    /// The pair after rotating in `new_current`: the old current is demoted
    /// and the old previous is discarded.
    #[must_use]
    pub fn rotated(&self, new_current: SecretString) -> Self {
        Self {
            current: new_current,
            previous: Some(self.current.clone()),
        }
    }
}

/// Lock-free holder for the active [`SecretPair`].
#[derive(Debug)]
pub struct SecretStore {
    pair: ArcSwap<SecretPair>,
}

impl SecretStore {
    pub fn new(pair: SecretPair) -> Self {
        Self {
            pair: ArcSwap::from_pointee(pair),
        }
    }

    /// Consistent view of both secrets.
    pub fn snapshot(&self) -> Arc<SecretPair> {
        self.pair.load_full()
    }

    /// Swap in a new pair. Single atomic store.
    pub fn replace(&self, pair: SecretPair) {
        self.pair.store(Arc::new(pair));
    }
}
