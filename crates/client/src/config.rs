//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ECOM_API_URL` - Base URL of the storefront API (http or https)
//!
//! ## Optional
//! - `ECOM_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `ECOM_LONG_REQUEST_TIMEOUT_SECS` - Timeout for long-running endpoints (default: 60)
//! - `ECOM_TOKEN_REFRESH_LEAD_SECS` - Refresh this long before access expiry (default: 60)
//! - `ECOM_CATALOG_CACHE_TTL_SECS` - Product listing cache lifetime (default: 300)
//! - `ECOM_COOKIE_FILE` - Where to persist auth cookies (default: in-memory only)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_LONG_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_REFRESH_LEAD_SECS: u64 = 60;
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the storefront API; always ends with `/`
    pub api_url: Url,
    /// Timeout applied to every request
    pub request_timeout: Duration,
    /// Timeout for requests marked long-running
    pub long_request_timeout: Duration,
    /// How long before access token expiry the background refresh fires
    pub refresh_lead: Duration,
    /// Lifetime of cached catalog responses
    pub catalog_cache_ttl: Duration,
    /// Cookie file for persisted sessions
    pub cookie_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the API URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL does not parse or is not
    /// http(s).
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url("ECOM_API_URL", api_url)?,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            long_request_timeout: Duration::from_secs(DEFAULT_LONG_REQUEST_TIMEOUT_SECS),
            refresh_lead: Duration::from_secs(DEFAULT_REFRESH_LEAD_SECS),
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_CACHE_TTL_SECS),
            cookie_file: None,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = get_required_env("ECOM_API_URL")?;
        let mut config = Self::new(&api_url)?;

        config.request_timeout =
            get_secs_or_default("ECOM_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        config.long_request_timeout = get_secs_or_default(
            "ECOM_LONG_REQUEST_TIMEOUT_SECS",
            DEFAULT_LONG_REQUEST_TIMEOUT_SECS,
        )?;
        config.refresh_lead =
            get_secs_or_default("ECOM_TOKEN_REFRESH_LEAD_SECS", DEFAULT_REFRESH_LEAD_SECS)?;
        config.catalog_cache_ttl =
            get_secs_or_default("ECOM_CATALOG_CACHE_TTL_SECS", DEFAULT_CATALOG_CACHE_TTL_SECS)?;
        config.cookie_file = get_optional_env("ECOM_COOKIE_FILE").map(PathBuf::from);

        Ok(config)
    }

    /// Persist cookies to the given file.
    #[must_use]
    pub fn with_cookie_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookie_file = Some(path.into());
        self
    }

    /// Resolve an API path (`/cart/items`) against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is malformed.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.api_url.join(path.trim_start_matches('/'))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get a duration in whole seconds with a default value.
fn get_secs_or_default(key: &str, default: u64) -> Result<Duration, ConfigError> {
    get_optional_env(key).map_or(Ok(Duration::from_secs(default)), |value| {
        value
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse the API base URL, forcing a trailing slash so relative joins keep
/// any path prefix (`https://shop.example/api/` + `cart` → `/api/cart`).
fn parse_api_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_applies_defaults() {
        let config = ClientConfig::new("http://localhost:4000").unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.long_request_timeout, Duration::from_secs(60));
        assert_eq!(config.refresh_lead, Duration::from_secs(60));
        assert!(config.cookie_file.is_none());
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        let config = ClientConfig::new("https://shop.example.com/api").unwrap();
        assert_eq!(
            config.endpoint("/cart/items").unwrap().as_str(),
            "https://shop.example.com/api/cart/items"
        );
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let result = ClientConfig::new("ftp://shop.example.com");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_rejects_garbage_url() {
        assert!(ClientConfig::new("not a url").is_err());
    }
}
