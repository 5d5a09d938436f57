//! Access/refresh token storage.
//!
//! Tokens are kept as two cookies, `ecom_access_token` and
//! `ecom_refresh_token`, each with its own expiry:
//!
//! - access: issued + TTL - safety margin, so a token is never sent in the
//!   last seconds of its life
//! - refresh: issued + server refresh TTL, capped at 30 days
//!
//! A cookie past its expiry reads as absent. The jar is mirrored to a
//! [`CookieStore`] on every change so sessions survive restarts.

mod cookie;
mod jwt;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use ecom_core::AuthTokens;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

pub use cookie::{Cookie, CookieStore, JsonCookieStore, MemoryCookieStore};

/// Cookie holding the bearer access token.
pub const ACCESS_TOKEN_COOKIE: &str = "ecom_access_token";
/// Cookie holding the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "ecom_refresh_token";

/// Access tokens are treated as expired this long before their real expiry.
const ACCESS_TOKEN_SAFETY_MARGIN_SECS: i64 = 60;
/// Access lifetime assumed when neither the response nor the token says.
const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
/// Refresh cookies never outlive this, whatever the server grants.
const MAX_REFRESH_TTL_SECS: i64 = 30 * 24 * 60 * 60;
/// An access token cannot outlive the session it belongs to.
const MAX_ACCESS_TTL_SECS: i64 = MAX_REFRESH_TTL_SECS;

/// Errors persisting or loading cookies.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("cookie file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cookie file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Thread-safe token store backed by a cookie jar.
///
/// Cheaply cloneable; clones share the same jar.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<TokenStoreInner>,
}

struct TokenStoreInner {
    jar: Mutex<HashMap<String, Cookie>>,
    backend: Box<dyn CookieStore>,
}

impl TokenStore {
    /// A store that forgets everything when dropped.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(TokenStoreInner {
                jar: Mutex::new(HashMap::new()),
                backend: Box::new(MemoryCookieStore),
            }),
        }
    }

    /// A store persisted to a JSON cookie file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn persistent(path: impl Into<PathBuf>) -> Result<Self, TokenStoreError> {
        Self::with_backend(JsonCookieStore::new(path))
    }

    /// A store over any cookie backend. Expired cookies are dropped on load.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to load.
    pub fn with_backend(backend: impl CookieStore + 'static) -> Result<Self, TokenStoreError> {
        let now = Utc::now();
        let jar = backend
            .load()?
            .into_iter()
            .filter(|cookie| !cookie.is_expired_at(now))
            .map(|cookie| (cookie.name.clone(), cookie))
            .collect();

        Ok(Self {
            inner: Arc::new(TokenStoreInner {
                jar: Mutex::new(jar),
                backend: Box::new(backend),
            }),
        })
    }

    fn jar(&self) -> MutexGuard<'_, HashMap<String, Cookie>> {
        self.inner.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live_value(&self, name: &str) -> Option<SecretString> {
        let now = Utc::now();
        self.jar()
            .get(name)
            .filter(|cookie| !cookie.is_expired_at(now))
            .map(|cookie| SecretString::from(cookie.value.clone()))
    }

    /// Current access token, unless missing or inside its safety margin.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.live_value(ACCESS_TOKEN_COOKIE)
    }

    /// Current refresh token, unless missing or expired.
    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.live_value(REFRESH_TOKEN_COOKIE)
    }

    /// When the access cookie stops being sent (already margin-adjusted).
    #[must_use]
    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        self.jar()
            .get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.expires_at)
    }

    /// Whether a session can be continued (a live refresh token exists).
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.refresh_token().is_some()
    }

    /// Whether `token` is still the access token on file.
    #[must_use]
    pub fn is_current_access_token(&self, token: &SecretString) -> bool {
        self.jar()
            .get(ACCESS_TOKEN_COOKIE)
            .is_some_and(|cookie| cookie.value == token.expose_secret())
    }

    /// Store a freshly issued token pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie backend fails to persist.
    pub fn store(&self, tokens: &AuthTokens) -> Result<(), TokenStoreError> {
        let now = Utc::now();
        let access = Cookie::new(
            ACCESS_TOKEN_COOKIE,
            tokens.access_token.clone(),
            access_cookie_expiry(tokens, now),
        );
        let refresh = Cookie::new(
            REFRESH_TOKEN_COOKIE,
            tokens.refresh_token.clone(),
            refresh_cookie_expiry(tokens, now),
        );

        let mut jar = self.jar();
        jar.insert(access.name.clone(), access);
        jar.insert(refresh.name.clone(), refresh);
        self.persist(&jar)
    }

    /// Forget both tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie backend fails to persist.
    pub fn clear(&self) -> Result<(), TokenStoreError> {
        let mut jar = self.jar();
        jar.remove(ACCESS_TOKEN_COOKIE);
        jar.remove(REFRESH_TOKEN_COOKIE);
        self.persist(&jar)
    }

    fn persist(&self, jar: &HashMap<String, Cookie>) -> Result<(), TokenStoreError> {
        let mut cookies: Vec<Cookie> = jar.values().cloned().collect();
        cookies.sort_by(|a, b| a.name.cmp(&b.name));
        self.inner.backend.save(&cookies)
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("has_access_token", &self.access_token().is_some())
            .field("has_refresh_token", &self.refresh_token().is_some())
            .finish_non_exhaustive()
    }
}

/// Access cookie expiry: issue time + TTL, less a safety margin.
///
/// The margin is at most half the TTL so short-lived tokens stay usable.
/// Server-supplied lifetimes are clamped to `MAX_ACCESS_TTL_SECS`.
fn access_cookie_expiry(tokens: &AuthTokens, now: DateTime<Utc>) -> DateTime<Utc> {
    let ttl = tokens
        .expires_in
        .or_else(|| jwt::expiry(&tokens.access_token).map(|exp| (exp - now).num_seconds()))
        .unwrap_or(DEFAULT_ACCESS_TTL_SECS)
        .clamp(0, MAX_ACCESS_TTL_SECS);
    let margin = ACCESS_TOKEN_SAFETY_MARGIN_SECS.min(ttl / 2);
    now + Duration::seconds(ttl - margin)
}

/// Refresh cookie expiry: server TTL capped at 30 days.
fn refresh_cookie_expiry(tokens: &AuthTokens, now: DateTime<Utc>) -> DateTime<Utc> {
    let ttl = tokens
        .refresh_expires_in
        .unwrap_or(MAX_REFRESH_TTL_SECS)
        .clamp(0, MAX_REFRESH_TTL_SECS);
    now + Duration::seconds(ttl)
}
