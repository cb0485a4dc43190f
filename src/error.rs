//! Error types for bundle-dl
//!
//! This module provides:
//! - The job error taxonomy (`NotFound`, `Overload`, `Busy`, `AllDownloadsFailed`)
//! - Ambient failures (configuration, I/O, HTTP client setup, invalid input)
//! - HTTP status code mapping for the API layer
//! - Structured error responses with machine-readable error codes

use crate::types::{JobId, JobStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for bundle-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bundle-dl
#[derive(Debug, Error)]
pub enum Error {
    /// No job with this id exists
    #[error("job {id} not found")]
    NotFound {
        /// The job ID that was not found
        id: JobId,
    },

    /// The job already holds the maximum number of links
    #[error("job {id} already has {cap} links")]
    Overload {
        /// The job that is full
        id: JobId,
        /// The link cap that was reached
        cap: usize,
    },

    /// The admission gate has no free processing slot
    #[error("server is busy: no free processing slot")]
    Busy,

    /// Every link of a job failed to download or validate
    #[error("all {failed} downloads failed for job {id}")]
    AllDownloadsFailed {
        /// The job whose downloads all failed
        id: JobId,
        /// Number of failed links
        failed: usize,
    },

    /// A job status change that would not move the job forward
    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The job being updated
        id: JobId,
        /// Its current status
        from: JobStatus,
        /// The rejected target status
        to: JobStatus,
    },

    /// A job with this id already exists
    #[error("job {0} already exists")]
    Conflict(JobId),

    /// The job id could not be parsed
    #[error("invalid job id: {0}")]
    InvalidJobId(String),

    /// The link is not an absolute http(s) URL
    #[error("invalid link: {0}")]
    InvalidLink(String),

    /// Malformed request body or parameters
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "storage_dir")
        key: Option<String>,
    },

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP client could not be set up
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// ZIP archive error
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// API error response format
///
/// Returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "job_not_found",
///     "message": "job 0b0d3c2e-8c61-4b7e-9a55-2c1b9f7c9e4a not found",
///     "details": {
///       "job_id": "0b0d3c2e-8c61-4b7e-9a55-2c1b9f7c9e4a"
///     }
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
    /// Machine-readable error code (e.g., "job_not_found", "busy")
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
            // 400 Bad Request - Client error (invalid input)
            Error::InvalidJobId(_) => 400,
            Error::InvalidLink(_) => 400,
            Error::InvalidRequest(_) => 400,
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::NotFound { .. } => 404,

            // 409 Conflict - the job cannot take this change in its current state
            Error::Overload { .. } => 409,
            Error::InvalidTransition { .. } => 409,
            Error::Conflict(_) => 409,

            // 422 Unprocessable Entity - the job ran but produced nothing
            Error::AllDownloadsFailed { .. } => 422,

            // 500 Internal Server Error - Server-side issues
            Error::Io(_) => 500,
            Error::Archive(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - HTTP client failure
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::Busy => 503,
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::NotFound { .. } => "job_not_found",
            Error::Overload { .. } => "link_cap_reached",
            Error::Busy => "busy",
            Error::AllDownloadsFailed { .. } => "all_downloads_failed",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::Conflict(_) => "conflict",
            Error::InvalidJobId(_) => "invalid_job_id",
            Error::InvalidLink(_) => "invalid_link",
            Error::InvalidRequest(_) => "validation_error",
            Error::Config { .. } => "config_error",
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Archive(_) => "archive_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::NotFound { id } => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::Overload { id, cap } => Some(serde_json::json!({
                "job_id": id,
                "link_cap": cap,
            })),
            Error::AllDownloadsFailed { id, failed } => Some(serde_json::json!({
                "job_id": id,
                "failed": failed,
            })),
            Error::InvalidTransition { id, from, to } => Some(serde_json::json!({
                "job_id": id,
                "current_status": from,
                "requested_status": to,
            })),
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
