//! Error taxonomy and the typed error body returned by the API.
//!
//! Every failure the API reports falls into one [`ErrorCategory`], which fixes
//! its HTTP status and default `errorCode`. Database constraint violations are
//! mapped onto the taxonomy through [`ConstraintViolation`] so they never leak
//! as bare 500s.

use serde::{Deserialize, Serialize};

/// Fixed error taxonomy shared by the API and its clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Authentication,
    Authorization,
    NotFound,
    Conflict,
    RateLimit,
    BusinessLogic,
    Database,
    ExternalService,
    Internal,
}

impl ErrorCategory {
    /// HTTP status code for this category.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Authentication => 401,
            Self::Authorization => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::BusinessLogic => 422,
            Self::RateLimit => 429,
            Self::Database | Self::Internal => 500,
            Self::ExternalService => 502,
        }
    }

    /// Default machine-readable error code.
    #[must_use]
    pub const fn error_code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Authentication => "AUTHENTICATION_ERROR",
            Self::Authorization => "AUTHORIZATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimit => "RATE_LIMIT_EXCEEDED",
            Self::BusinessLogic => "BUSINESS_LOGIC_ERROR",
            Self::Database => "DATABASE_ERROR",
            Self::ExternalService => "EXTERNAL_SERVICE_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Reason phrase used in the `error` field.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::Validation => "Bad Request",
            Self::Authentication => "Unauthorized",
            Self::Authorization => "Forbidden",
            Self::NotFound => "Not Found",
            Self::Conflict => "Conflict",
            Self::BusinessLogic => "Unprocessable Entity",
            Self::RateLimit => "Too Many Requests",
            Self::Database | Self::Internal => "Internal Server Error",
            Self::ExternalService => "Bad Gateway",
        }
    }

    /// Classify a bare HTTP status (used when the body is not a typed error).
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Authentication,
            403 => Self::Authorization,
            404 => Self::NotFound,
            409 => Self::Conflict,
            422 => Self::BusinessLogic,
            429 => Self::RateLimit,
            502..=504 => Self::ExternalService,
            400..=499 => Self::Validation,
            _ => Self::Internal,
        }
    }
}

/// Relational constraint failures that get special-cased before falling back
/// to [`ErrorCategory::Database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintViolation {
    /// A unique index rejected the write.
    Unique,
    /// A foreign key pointed at a missing row.
    ForeignKey,
    /// An update or delete targeted a row that does not exist.
    RecordNotFound,
}

impl ConstraintViolation {
    #[must_use]
    pub const fn category(self) -> ErrorCategory {
        match self {
            Self::Unique => ErrorCategory::Conflict,
            Self::ForeignKey => ErrorCategory::Validation,
            Self::RecordNotFound => ErrorCategory::NotFound,
        }
    }

    #[must_use]
    pub const fn error_code(self) -> &'static str {
        match self {
            Self::Unique => "DUPLICATE_ENTRY",
            Self::ForeignKey => "FOREIGN_KEY_VIOLATION",
            Self::RecordNotFound => "RECORD_NOT_FOUND",
        }
    }
}

/// Typed error body: `{ statusCode, message, error, errorCode, correlationId,
/// timestamp, path, details? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Build a body for a category with its default error code.
    #[must_use]
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            status_code: category.status_code(),
            message: message.into(),
            error: category.reason().to_string(),
            error_code: category.error_code().to_string(),
            correlation_id: None,
            timestamp: None,
            path: None,
            details: None,
        }
    }

    /// Build a body for a constraint violation.
    #[must_use]
    pub fn from_constraint(violation: ConstraintViolation, message: impl Into<String>) -> Self {
        Self::new(violation.category(), message).with_code(violation.error_code())
    }

    /// Override the machine-readable error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = code.into();
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Category implied by the status code.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        ErrorCategory::from_status(self.status_code)
    }
}
