//! Error types for wxr-import
//!
//! This module provides comprehensive error handling for the library, including:
//! - Domain-specific error types (Parse, Store, Media, etc.)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//! - Context information (source URL, file path, byte counts, etc.)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for wxr-import operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wxr-import
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues. Variants fall into three
/// severity classes: fatal for the whole run ([`Error::Parse`]), per-record
/// (caught inside an import phase, counted as failed, never propagated), and
/// control-surface rejections ([`Error::ImportInProgress`], [`Error::NotFound`]).
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "upload.root_dir")
        key: Option<String>,
    },

    /// Malformed WXR document; aborts the whole import run
    #[error("invalid WXR document: {0}")]
    Parse(String),

    /// The referenced source file does not exist or is not readable
    #[error("source file missing: {path}")]
    SourceMissing {
        /// The path that was supplied to trigger or preview
        path: PathBuf,
    },

    /// An import is already running; only one job may be in progress
    #[error("an import is already in progress (started by {initiator})")]
    ImportInProgress {
        /// Who started the job that is currently running
        initiator: String,
    },

    /// Content store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// SQLx database error
    #[error("store error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Media retrieval or processing error
    #[error("media error: {0}")]
    Media(#[from] MediaError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No import job to report on or cancel
    #[error("not found: {0}")]
    NotFound(String),

    /// The run was stopped by a cancel request
    #[error("import cancelled by {initiator}")]
    Cancelled {
        /// Who requested the cancellation
        initiator: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Insufficient disk space under the upload root to admit an import
    #[error("insufficient disk space: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        /// Number of bytes required for the operation
        required: u64,
        /// Number of bytes currently available on disk
        available: u64,
    },

    /// Failed to check disk space
    #[error("failed to check disk space: {0}")]
    DiskSpaceCheckFailed(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Content-store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to connect to the backing database
    #[error("failed to connect to store: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Entity not found
    #[error("entity not found: {0}")]
    NotFound(String),

    /// Constraint violation (e.g., duplicate natural key)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Media pipeline errors
#[derive(Debug, Error)]
pub enum MediaError {
    /// Remote asset could not be fetched
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        /// The source URL that failed
        url: String,
        /// Why the fetch failed (status code, timeout, connection error)
        reason: String,
    },

    /// Attachment is not an importable image type
    #[error("unsupported media type {mime} for {url}")]
    UnsupportedType {
        /// The source URL of the attachment
        url: String,
        /// The detected mimetype
        mime: String,
    },

    /// Downloaded file could not be decoded as an image
    #[error("failed to decode image {path}: {reason}")]
    Decode {
        /// Local path of the downloaded file
        path: PathBuf,
        /// Decoder error message
        reason: String,
    },

    /// Writing the asset or a derivative to disk failed
    #[error("failed to write {path}: {reason}")]
    WriteFailed {
        /// Destination path that could not be written
        path: PathBuf,
        /// Why the write failed
        reason: String,
    },

    /// The attachment record has no usable source URL
    #[error("attachment {source_id} has no source URL")]
    MissingUrl {
        /// WXR post id of the attachment item
        source_id: String,
    },
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
/// It follows a standard format with machine-readable error codes,
/// human-readable messages, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "import_in_progress",
///     "message": "an import is already in progress (started by admin)",
///     "details": {
///       "initiator": "admin"
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
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    ///
    /// Clients can use this for programmatic error handling.
    pub code: String,

    /// Human-readable error message
    ///
    /// This is suitable for displaying to end users.
    pub message: String,

    /// Optional additional context about the error
    ///
    /// This can include fields like source URLs, file paths, byte counts, etc.
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

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create a "conflict" error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("conflict", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
///
/// This trait maps domain errors to appropriate HTTP status codes.
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

            // 422 Unprocessable Entity - the referenced document is unusable
            Error::Parse(_) => 422,
            Error::SourceMissing { .. } => 422,
            Error::Media(MediaError::UnsupportedType { .. }) => 422,
            Error::Media(MediaError::Decode { .. }) => 422,
            Error::Media(MediaError::MissingUrl { .. }) => 422,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 409 Conflict - single-slot admission, cancelled runs
            Error::ImportInProgress { .. } => 409,
            Error::Cancelled { .. } => 409,

            // 500 Internal Server Error - Server-side issues
            Error::Store(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::Media(MediaError::WriteFailed { .. }) => 500,
            Error::ApiServerError(_) => 500,
            Error::DiskSpaceCheckFailed(_) => 500,
            Error::Serialization(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - the remote media host failed us
            Error::Network(_) => 502,
            Error::Media(MediaError::Fetch { .. }) => 502,

            // 507 Insufficient Storage
            Error::InsufficientSpace { .. } => 507,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Parse(_) => "invalid_wxr",
            Error::SourceMissing { .. } => "source_missing",
            Error::ImportInProgress { .. } => "import_in_progress",
            Error::Store(_) => "store_error",
            Error::Sqlx(_) => "store_error",
            Error::Media(e) => match e {
                MediaError::Fetch { .. } => "media_fetch_failed",
                MediaError::UnsupportedType { .. } => "unsupported_media_type",
                MediaError::Decode { .. } => "media_decode_failed",
                MediaError::WriteFailed { .. } => "media_write_failed",
                MediaError::MissingUrl { .. } => "media_missing_url",
            },
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::Cancelled { .. } => "cancelled",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::InsufficientSpace { .. } => "insufficient_space",
            Error::DiskSpaceCheckFailed(_) => "disk_space_check_failed",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::SourceMissing { path } => Some(serde_json::json!({
                "path": path,
            })),
            Error::ImportInProgress { initiator } => Some(serde_json::json!({
                "initiator": initiator,
            })),
            Error::Cancelled { initiator } => Some(serde_json::json!({
                "initiator": initiator,
            })),
            Error::Media(MediaError::Fetch { url, reason }) => Some(serde_json::json!({
                "url": url,
                "reason": reason,
            })),
            Error::Media(MediaError::UnsupportedType { url, mime }) => Some(serde_json::json!({
                "url": url,
                "mime": mime,
            })),
            Error::Media(MediaError::Decode { path, .. }) => Some(serde_json::json!({
                "path": path,
            })),
            Error::InsufficientSpace {
                required,
                available,
            } => Some(serde_json::json!({
                "required_bytes": required,
                "available_bytes": available,
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
