//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - The job-facing error taxonomy (not-found, not-ready, failed, bad request)
//! - Extraction-engine errors kept separate so their detail never leaks to clients
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::JobId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "engine.ytdlp_path")
        key: Option<String>,
    },

    /// Malformed request parameters, rejected before any job is created
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Unknown job id (or other missing resource)
    #[error("{0} not found")]
    NotFound(String),

    /// Job exists but has not produced a result yet — transient, retry later
    #[error("job {id} has no result yet")]
    NotReady {
        /// The job that is still running
        id: JobId,
    },

    /// Job reached `Failed`: the engine failed and fallback discovery found nothing
    #[error("job {id} failed")]
    JobFailed {
        /// The failed job
        id: JobId,
    },

    /// Extraction engine error surfaced synchronously (probe, legacy download)
    #[error("extraction engine error: {0}")]
    Engine(#[from] EngineError),

    /// Engine finished but no output file matched the resolved template
    #[error("no output file found for template {template}")]
    OutputMissing {
        /// The template stem that was searched for
        template: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServer(String),
}

/// Errors produced while driving the external extraction engine
///
/// These carry subprocess detail (exit codes, stderr tails) and are logged
/// server-side; clients only ever see the generic mapped message.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine binary could not be launched
    #[error("failed to launch {binary}: {source}")]
    Spawn {
        /// Path of the binary that failed to start
        binary: PathBuf,
        /// Underlying OS error
        source: std::io::Error,
    },

    /// The engine process exited unsuccessfully
    #[error("engine exited with status {status}: {detail}")]
    Failed {
        /// Process exit code (-1 when killed by signal)
        status: i32,
        /// Tail of the engine's stderr output
        detail: String,
    },

    /// The engine's metadata output could not be parsed
    #[error("invalid engine metadata: {0}")]
    InvalidMetadata(String),

    /// I/O error talking to the engine process
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// API error response format
///
/// Returned by API endpoints when an error occurs: a machine-readable
/// code, a human-readable message, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_ready",
///     "message": "job 4f0f… has no result yet",
///     "details": { "job_id": "4f0f…" }
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
    /// Machine-readable error code (e.g., "not_found", "bad_request")
    pub code: String,

    /// Human-readable error message, suitable for displaying to end users
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

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "bad request" error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
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
            Error::Config { .. } => 400,
            Error::BadRequest(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 202 Accepted - result not produced yet, retryable
            Error::NotReady { .. } => 202,

            // 500 Internal Server Error - terminal job failure / server-side issues
            Error::JobFailed { .. } => 500,
            Error::OutputMissing { .. } => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServer(_) => 500,

            // 502 Bad Gateway - upstream extraction engine errors
            Error::Engine(_) => 502,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::BadRequest(_) => "bad_request",
            Error::NotFound(_) => "not_found",
            Error::NotReady { .. } => "not_ready",
            Error::JobFailed { .. } => "job_failed",
            Error::OutputMissing { .. } => "output_missing",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServer(_) => "api_server_error",
            Error::Engine(_) => "engine_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();

        // Engine detail (exit codes, stderr) is logged server-side only;
        // the client gets a generic message for upstream failures.
        let message = match &error {
            Error::Engine(_) => "extraction engine request failed, try again later".to_string(),
            other => other.to_string(),
        };

        let details = match &error {
            Error::NotReady { id } => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::JobFailed { id } => Some(serde_json::json!({
                "job_id": id,
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
