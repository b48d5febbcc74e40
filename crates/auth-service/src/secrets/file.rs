//! Env-style secrets file (`KEY=value` lines).
//!
//! Rotation persists the new pair here so it survives a restart. Only the
//! `JWT_SECRET_CURRENT` and `JWT_SECRET_PREVIOUS` lines are touched; every
//! other line (comments, unrelated settings) is written back as it was.
//!
//! Writes go to a temp file in the same directory, are fsynced, then renamed
//! over the target. A crash leaves either the old file or the new one.

use super::SecretPair;
use common::secret::{ExposeSecret, SecretString};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CURRENT_KEY: &str = "JWT_SECRET_CURRENT";
pub const PREVIOUS_KEY: &str = "JWT_SECRET_PREVIOUS";

#[derive(Debug, Error)]
pub enum SecretFileError {
    #[error("Failed to read secrets file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write secrets file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct SecretFile {
    path: PathBuf,
}

impl SecretFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the pair stored in the file.
    ///
    /// Returns `Ok(None)` if the file does not exist or does not define a
    /// non-empty `JWT_SECRET_CURRENT`.
    pub fn load(&self) -> Result<Option<SecretPair>, SecretFileError> {
        let contents = match self.read_existing()? {
            Some(contents) => contents,
            None => return Ok(None),
        };

        let mut current = None;
        let mut previous = None;
        for line in contents.lines() {
            match parse_line(line) {
                Some((CURRENT_KEY, value)) if !value.is_empty() => {
                    current = Some(SecretString::from(value.to_string()));
                }
                Some((PREVIOUS_KEY, value)) if !value.is_empty() => {
                    previous = Some(SecretString::from(value.to_string()));
                }
                _ => {}
            }
        }

        Ok(current.map(|current| SecretPair::new(current, previous)))
    }

    /// Atomically write `pair` into the file, preserving unrelated lines.
    pub fn persist(&self, pair: &SecretPair) -> Result<(), SecretFileError> {
        let existing = self.read_existing()?.unwrap_or_default();
        let rendered = render_env_file(&existing, pair);

        let write_err = |source| SecretFileError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // NamedTempFile is created 0600 on unix
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(rendered.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        Ok(())
    }

    fn read_existing(&self) -> Result<Option<String>, SecretFileError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SecretFileError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Split a `KEY=value` line. Accepts an `export ` prefix and strips one
/// level of matching quotes from the value.
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    Some((key.trim(), value))
}

/// Rewrite `existing` with the secret lines replaced by `pair`.
///
/// Keys that were not present are appended. A pair without a previous
/// secret drops any `JWT_SECRET_PREVIOUS` line.
pub fn render_env_file(existing: &str, pair: &SecretPair) -> String {
    let current_line = format!("{}={}", CURRENT_KEY, pair.current().expose_secret());
    let previous_line = pair
        .previous()
        .map(|p| format!("{}={}", PREVIOUS_KEY, p.expose_secret()));

    let mut wrote_current = false;
    let mut wrote_previous = false;
    let mut lines: Vec<String> = Vec::new();

    for line in existing.lines() {
        match parse_line(line).map(|(key, _)| key) {
            Some(CURRENT_KEY) => {
                if !wrote_current {
                    lines.push(current_line.clone());
                    wrote_current = true;
                }
            }
            Some(PREVIOUS_KEY) => {
                if let (Some(previous_line), false) = (&previous_line, wrote_previous) {
                    lines.push(previous_line.clone());
                    wrote_previous = true;
                }
            }
            _ => lines.push(line.to_string()),
        }
    }

    if !wrote_current {
        lines.push(current_line);
    }
    if let (Some(previous_line), false) = (previous_line, wrote_previous) {
        lines.push(previous_line);
    }

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}
