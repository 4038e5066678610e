//! Error types for the Fabric server

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::archive::ArchiveError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Blob store failure; `message` is what the client sees
    #[error("{message}: {source}")]
    Storage {
        message: String,
        details: Option<Value>,
        #[source]
        source: StorageError,
    },

    /// A metadata row references a blob that does not exist
    #[error("Asset storage inconsistent: {0}")]
    Inconsistent(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Metadata write that failed after blobs were already stored
    #[error("{message}: {source}")]
    Persistence {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn storage(message: impl Into<String>, source: StorageError) -> Self {
        Self::Storage {
            message: message.into(),
            details: None,
            source,
        }
    }

    pub fn persistence(source: sqlx::Error) -> Self {
        Self::Persistence {
            message: "Failed to persist asset metadata".to_string(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Storage { .. }
            | Self::Inconsistent(_)
            | Self::Database(_)
            | Self::Persistence { .. }
            | Self::Configuration(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Blob store errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("S3 SDK error: {0}")]
    SdkError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt object metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::storage("Storage error", err)
    }
}

impl From<ArchiveError> for AppError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::UnsupportedPath(path) => {
                AppError::validation(format!("Unsupported entry path: {}", path))
            }
            ArchiveError::Empty => AppError::validation("Zip archive contained no files"),
            ArchiveError::TooLarge(limit) => {
                AppError::PayloadTooLarge(format!("Decompressed archive exceeds {} byte limit", limit))
            }
            ArchiveError::Invalid(e) => {
                AppError::validation_with("Invalid zip archive", Value::String(e.to_string()))
            }
            ArchiveError::Io(e) => AppError::Internal(format!("archive io: {}", e)),
            ArchiveError::Join(e) => AppError::Internal(format!("archive task: {}", e)),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation_with("Invalid payload", Value::String(rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::validation_with("Invalid path parameter", Value::String(rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::validation_with("Invalid query string", Value::String(rejection.body_text()))
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (error, details) = match self {
            AppError::Validation { message, details } => (message, details),
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::UnsupportedMediaType(msg)
            | AppError::PayloadTooLarge(msg) => (msg, None),
            AppError::Storage {
                message,
                details,
                source,
            } => {
                tracing::error!(error = %source, details = ?details, "{}", message);
                (message, details)
            }
            AppError::Inconsistent(context) => {
                tracing::error!(context = %context, "Metadata references a missing blob");
                ("Asset storage inconsistent".to_string(), None)
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                ("Database error".to_string(), None)
            }
            AppError::Persistence { message, source } => {
                tracing::error!(error = %source, "{}", message);
                (message, None)
            }
            AppError::Configuration(msg) => {
                tracing::error!("Configuration fault: {}", msg);
                ("Token configuration invalid".to_string(), None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal Server Error".to_string(), None)
            }
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}
