//! Unified client error type.
//!
//! Distinguishes transport failures (connection refused, timeouts) from errors
//! the API reported with a typed body, so callers can decide between "retry
//! later" and "show the server's message".

use ecom_core::{EmailError, ErrorBody, ErrorCategory};
use thiserror::Error;

use crate::http::RefreshError;
use crate::tokens::TokenStoreError;

/// Errors returned by the storefront client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (DNS, connect, TLS, reset).
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The request exceeded its timeout.
    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error {}: {} ({})", .0.status_code, .0.message, .0.error_code)]
    Api(ErrorBody),

    /// A success response did not match the expected shape.
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The endpoint path could not be joined onto the base URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// An identifier that cannot stand as a single path segment.
    #[error("Invalid identifier in path: {0:?}")]
    InvalidPathSegment(String),

    /// The access token was rejected and could not be refreshed.
    #[error("Session expired: {0}")]
    SessionExpired(#[from] RefreshError),

    /// An operation needs a signed-in user and there is none.
    #[error("Not signed in")]
    NotAuthenticated,

    /// Input rejected before it was sent.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Cookie persistence failed.
    #[error("Token store error: {0}")]
    TokenStore(#[from] TokenStoreError),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err)
        } else {
            Self::Network(err)
        }
    }
}

impl ClientError {
    /// The request failed before the server could answer.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    /// The server rejected the request as the caller's fault (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|status| (400..500).contains(&status))
    }

    /// The server failed to handle the request (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|status| status >= 500)
    }

    /// HTTP status associated with the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api(body) => Some(body.status_code),
            Self::SessionExpired(_) | Self::NotAuthenticated => Some(401),
            _ => None,
        }
    }

    /// Taxonomy category for API-reported errors.
    #[must_use]
    pub const fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Api(body) => Some(body.category()),
            Self::SessionExpired(_) | Self::NotAuthenticated => {
                Some(ErrorCategory::Authentication)
            }
            _ => None,
        }
    }

    /// Machine-readable `errorCode` from the API body.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Api(body) => Some(body.error_code.as_str()),
            _ => None,
        }
    }

    /// Correlation id to quote when reporting the failure.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::Api(body) => body.correlation_id.as_deref(),
            _ => None,
        }
    }

    /// Message suitable for showing to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(body) => body.message.clone(),
            Self::Network(_) => "Could not reach the store. Check your connection.".to_string(),
            Self::Timeout(_) => "The store took too long to respond.".to_string(),
            Self::SessionExpired(_) | Self::NotAuthenticated => {
                "Please sign in to continue.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_predicates() {
        let err = ClientError::Api(ErrorBody::new(ErrorCategory::NotFound, "Product not found"));
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert!(!err.is_network_error());
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.error_code(), Some("NOT_FOUND"));
        assert_eq!(err.user_message(), "Product not found");
    }

    #[test]
    fn test_server_error_predicates() {
        let err = ClientError::Api(ErrorBody::new(ErrorCategory::Database, "boom"));
        assert!(err.is_server_error());
        assert!(!err.is_client_error());
        assert_eq!(err.category(), Some(ErrorCategory::Internal));
    }

    #[test]
    fn test_session_expired_is_authentication() {
        let err = ClientError::SessionExpired(RefreshError::MissingRefreshToken);
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.category(), Some(ErrorCategory::Authentication));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_display_includes_error_code() {
        let body = ErrorBody::new(ErrorCategory::BusinessLogic, "Coupon expired")
            .with_code("COUPON_EXPIRED");
        assert_eq!(
            ClientError::Api(body).to_string(),
            "API error 422: Coupon expired (COUPON_EXPIRED)"
        );
    }
}
