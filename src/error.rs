//! Error types for the admin service.
//!
//! Operation failures collapse into two user-facing kinds: an upstream failure
//! (anything that went wrong talking to the LiteLLM proxy) and a not-found
//! failure raised when a budget assignment targets a budget that does not
//! exist. The remaining variants cover input validation, the session gate and
//! startup concerns.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the admin service.
#[derive(Error, Debug)]
pub enum Error {
    /// A call to the LiteLLM proxy failed or returned data that did not validate
    #[error("Upstream call failed: {message}")]
    Upstream {
        /// Proxy-provided message, or a generic per-operation message
        message: String,
        /// HTTP status returned by the proxy, if a response was received
        status: Option<u16>,
    },

    /// The referenced resource does not exist on the proxy
    #[error("Not found: {message}")]
    NotFound {
        /// Detailed error message
        message: String,
    },

    /// Input failed validation before any call was made
    #[error("Validation error: {message}")]
    Validation {
        /// Detailed error message
        message: String,
        /// Field that caused the error, if applicable
        field: Option<String>,
    },

    /// Caller is not authenticated as the admin identity
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Detailed error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Detailed error message
        message: String,
        /// Configuration key that caused the error
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (unexpected condition)
    #[error("Internal error: {message}")]
    Internal {
        /// Detailed error message
        message: String,
    },
}

/// Error codes surfaced to RPC callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Default code for upstream and unexpected failures
    InternalServerError,
    /// Budget assignment target is missing
    NotFound,
    /// Malformed RPC input
    BadRequest,
    /// Missing or invalid admin session
    Unauthorized,
}

impl ErrorCode {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Error {
    /// Create an upstream error without an HTTP status.
    pub fn upstream(message: impl Into<String>) -> Self {
        Error::Upstream {
            message: message.into(),
            status: None,
        }
    }

    /// Create an upstream error carrying the proxy's HTTP status.
    pub fn upstream_with_status(message: impl Into<String>, status: u16) -> Self {
        Error::Upstream {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error with field context.
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Error::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: None,
        }
    }

    /// Create a configuration error for a specific key.
    pub fn config_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// The RPC code this error is reported under.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NotFound { .. } => ErrorCode::NotFound,
            Error::Validation { .. } => ErrorCode::BadRequest,
            Error::Unauthorized { .. } => ErrorCode::Unauthorized,
            _ => ErrorCode::InternalServerError,
        }
    }

    /// Message shown to RPC callers, without the variant prefix.
    pub fn public_message(&self) -> String {
        match self {
            Error::Upstream { message, .. }
            | Error::NotFound { message }
            | Error::Validation { message, .. }
            | Error::Unauthorized { message } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Get the error category for logs and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Upstream { .. } => "upstream",
            Error::NotFound { .. } => "not_found",
            Error::Validation { .. } => "validation",
            Error::Unauthorized { .. } => "unauthorized",
            Error::Config { .. } => "config",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Internal { .. } => "internal",
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .min()
            .map(|field| field.to_string());
        Error::Validation {
            message: errors.to_string(),
            field,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Error::config(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::upstream("boom").code(), ErrorCode::InternalServerError);
        assert_eq!(Error::not_found("missing").code(), ErrorCode::NotFound);
        assert_eq!(Error::validation("bad").code(), ErrorCode::BadRequest);
        assert_eq!(Error::unauthorized("nope").code(), ErrorCode::Unauthorized);
        assert_eq!(Error::config("cfg").code(), ErrorCode::InternalServerError);
    }

    #[test]
    fn test_public_message_strips_prefix() {
        let err = Error::upstream_with_status("Budget table locked", 500);
        assert_eq!(err.public_message(), "Budget table locked");
        assert!(err.to_string().starts_with("Upstream call failed"));
    }

    #[test]
    fn test_error_code_serializes_screaming_case() {
        let json = serde_json::to_string(&ErrorCode::InternalServerError).unwrap();
        assert_eq!(json, "\"INTERNAL_SERVER_ERROR\"");
        assert_eq!(ErrorCode::NotFound.to_string(), "NOT_FOUND");
    }

    #[test]
    fn test_category() {
        assert_eq!(Error::not_found("x").category(), "not_found");
        assert_eq!(Error::internal("x").category(), "internal");
    }
}
