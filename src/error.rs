//! Error types for page-relay
//!
//! This module provides error handling for the library, including:
//! - The fetch failure taxonomy reported over the push channel ([`FetchError`])
//! - The crate-level [`Error`] returned by synchronous operations
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for page-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for page-relay
///
/// Returned by operations that fail before a relay channel exists (request
/// validation, configuration, server startup). Failures of an in-flight relay
/// are never returned this way; they surface as a terminal `error` event.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "relay.event_buffer")
        key: Option<String>,
    },

    /// The client request was malformed (missing or unusable parameters)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Requested resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// HTTP client error (client construction, TLS setup)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress - not accepting new relays
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,
}

/// Failures of a single relay, from the outbound request to the final decode.
///
/// None of these are retried. Unknown or unsupported charsets are deliberately
/// absent: they fall back to UTF-8 instead of failing the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The origin answered with a non-success status
    #[error("HTTP error: {status} {reason}")]
    RemoteStatus {
        /// Numeric HTTP status returned by the origin
        status: u16,
        /// Canonical reason phrase for the status (may be empty)
        reason: String,
    },

    /// The origin did not return a hypertext document
    #[error("unsupported content type: {content_type}, expected HTML")]
    UnsupportedContentType {
        /// The declared content type, or "unknown" when absent
        content_type: String,
    },

    /// Network or stream failure before or during the body transfer
    #[error("transfer failed: {reason}")]
    Transfer {
        /// What went wrong
        reason: String,
    },

    /// The body contained byte sequences invalid for its encoding (strict decoding only)
    #[error("body is not valid {encoding}")]
    Decode {
        /// Name of the encoding the body was decoded with
        encoding: String,
    },
}

impl FetchError {
    /// Create a transfer error from anything displayable
    pub fn transfer(reason: impl std::fmt::Display) -> Self {
        Self::Transfer {
            reason: reason.to_string(),
        }
    }

    /// Message carried by the terminal `error` event
    pub fn event_message(&self) -> String {
        format!("failed to load content: {}", self)
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when a request fails before a
/// relay channel is opened.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "invalid_request",
///     "message": "invalid request: query parameter 'url' is required"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "invalid_request")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Machine-readable error code for this error
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::InvalidRequest(_) => 400,

            Error::NotFound(_) => 404,

            Error::Network(_) => 502,

            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,

            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidRequest(_) => "invalid_request",
            Error::NotFound(_) => "not_found",
            Error::Network(_) => "network_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("relay.event_buffer".into()),
                },
                400,
                "config_error",
            ),
            (
                Error::InvalidRequest("url missing".into()),
                400,
                "invalid_request",
            ),
            (Error::NotFound("keyword 'x'".into()), 404, "not_found"),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (
                Error::ApiServerError("bind failed".into()),
                500,
                "api_server_error",
            ),
            (Error::ShuttingDown, 503, "shutting_down"),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_status_and_code() {
        for (error, status, code) in all_error_variants() {
            assert_eq!(error.status_code(), status, "status for {error:?}");
            assert_eq!(error.error_code(), code, "code for {error:?}");
        }
    }

    #[test]
    fn remote_status_message_carries_numeric_status() {
        let err = FetchError::RemoteStatus {
            status: 404,
            reason: "Not Found".into(),
        };
        let message = err.event_message();
        assert!(message.starts_with("failed to load content:"));
        assert!(message.contains("404"), "got: {message}");
    }

    #[test]
    fn unsupported_content_type_message_names_the_type() {
        let err = FetchError::UnsupportedContentType {
            content_type: "application/json".into(),
        };
        assert!(err.event_message().contains("application/json"));
        assert!(err.to_string().contains("expected HTML"));
    }

    #[test]
    fn api_error_includes_config_key() {
        let api_error: ApiError = Error::Config {
            message: "event buffer must hold at least one event".into(),
            key: Some("relay.event_buffer".into()),
        }
        .into();

        assert_eq!(api_error.error.code, "config_error");
        assert_eq!(api_error.error.details.unwrap()["key"], "relay.event_buffer");
    }

    #[test]
    fn api_error_omits_details_when_absent() {
        let api_error: ApiError = Error::InvalidRequest("url missing".into()).into();
        let json = serde_json::to_value(&api_error).unwrap();

        assert_eq!(json["error"]["code"], "invalid_request");
        assert!(json["error"].get("details").is_none());
    }
}
