//! Cookies and the backends that persist them.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::TokenStoreError;

/// A named value with an absolute expiry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl Cookie {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires_at,
        }
    }

    /// Whether the cookie is past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Debug for Cookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Where cookies live between process runs.
pub trait CookieStore: Send + Sync {
    /// Load every persisted cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage exists but cannot be read.
    fn load(&self) -> Result<Vec<Cookie>, TokenStoreError>;

    /// Replace the persisted cookies with `cookies`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, cookies: &[Cookie]) -> Result<(), TokenStoreError>;
}

/// Keeps nothing; cookies live only as long as the [`super::TokenStore`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryCookieStore;

impl CookieStore for MemoryCookieStore {
    fn load(&self) -> Result<Vec<Cookie>, TokenStoreError> {
        Ok(Vec::new())
    }

    fn save(&self, _cookies: &[Cookie]) -> Result<(), TokenStoreError> {
        Ok(())
    }
}

/// Persists cookies as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonCookieStore {
    path: PathBuf,
}

impl JsonCookieStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CookieStore for JsonCookieStore {
    fn load(&self) -> Result<Vec<Cookie>, TokenStoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(TokenStoreError::Io(e)),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&contents)?)
    }

    /// Replace the file atomically. The jar holds refresh tokens, so the
    /// file is readable by its owner only (`0600` on unix).
    fn save(&self, cookies: &[Cookie]) -> Result<(), TokenStoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        // Write-then-rename so a crash never leaves a half-written jar
        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, cookies)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
