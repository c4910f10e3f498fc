//! Error types for fetch-queue
//!
//! This module provides the error handling for the library:
//! - [`Error`], the crate-wide error returned by fallible operations
//! - [`FetchError`], the failure of a single fetch, whose text becomes the
//!   reason carried by a `Failed` event
//! - HTTP status code mapping and structured JSON bodies for the API layer

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for fetch-queue operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fetch-queue
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "source.program")
        key: Option<String>,
    },

    /// A fetch failed. Displays as the bare reason so it can be surfaced to observers verbatim.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Reading a progress snapshot failed (transient, swallowed by the progress monitor)
    #[error("progress unavailable: {0}")]
    Snapshot(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Submitted input was rejected by the caller-facing layer
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Operation not supported (missing fetcher binary, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),
}

/// Failure of a single fetch.
///
/// The `Display` text is the human-readable reason reported to subscribers.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The fetch engine reported a failure
    #[error("{0}")]
    Failed(String),

    /// The fetcher program could not be started
    #[error("failed to launch fetcher: {0}")]
    Launch(#[source] std::io::Error),

    /// The fetch future panicked
    #[error("fetch panicked: {0}")]
    Panicked(String),

    /// The progress monitor stopped unexpectedly while the fetch was still running
    #[error("progress monitor stopped unexpectedly: {0}")]
    MonitorCrashed(String),

    /// The service shut down while the job was executing
    #[error("service shutting down")]
    Interrupted,
}

/// Structured error body returned by the API
///
/// ```json
/// {
///   "error": {
///     "code": "validation_error",
///     "message": "input must not be blank"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "shutting_down", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::InvalidInput(_) => 400,

            Error::Fetch(_) => 502,

            Error::ShuttingDown => 503,
            Error::Snapshot(_) => 503,

            Error::NotSupported(_) => 501,

            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidInput(_) => "validation_error",
            Error::Fetch(e) => match e {
                FetchError::Failed(_) => "fetch_failed",
                FetchError::Launch(_) => "fetcher_launch_failed",
                FetchError::Panicked(_) => "fetch_panicked",
                FetchError::MonitorCrashed(_) => "monitor_crashed",
                FetchError::Interrupted => "interrupted",
            },
            Error::Snapshot(_) => "progress_unavailable",
            Error::Io(_) => "io_error",
            Error::ShuttingDown => "shutting_down",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::NotSupported(_) => "not_supported",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
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

    #[test]
    fn fetch_failure_displays_bare_reason() {
        let error = Error::from(FetchError::Failed("network unreachable".into()));
        assert_eq!(error.to_string(), "network unreachable");
        assert_eq!(error.status_code(), 502);
        assert_eq!(error.error_code(), "fetch_failed");
    }

    #[test]
    fn shutting_down_maps_to_service_unavailable() {
        let error = Error::ShuttingDown;
        assert_eq!(error.status_code(), 503);
        assert_eq!(error.error_code(), "shutting_down");
    }

    #[test]
    fn config_error_carries_key_in_details() {
        let api: ApiError = Error::Config {
            message: "fetcher not found".into(),
            key: Some("source.program".into()),
        }
        .into();

        assert_eq!(api.error.code, "config_error");
        assert_eq!(api.error.message, "configuration error: fetcher not found");
        assert_eq!(
            api.error.details,
            Some(serde_json::json!({ "key": "source.program" }))
        );
    }

    #[test]
    fn api_error_omits_empty_details_when_serialized() {
        let json = serde_json::to_value(ApiError::validation("input must not be blank")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "error": {
                    "code": "validation_error",
                    "message": "input must not be blank"
                }
            })
        );
    }
}
