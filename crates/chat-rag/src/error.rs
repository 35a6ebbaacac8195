//! Error types for the chat service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for chat and knowledge-base operations
pub type Result<T> = std::result::Result<T, Error>;

/// Chat service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upload is not one of the supported document formats
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Upload exceeds the configured size limit
    #[error("File too large: {size} bytes (maximum is {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    /// Text extraction failed
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Request validation error
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Embedding service call failed
    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    /// Vector index unreachable or rejected the operation
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// Answer generation failed or timed out
    #[error("Answer generation failed: {0}")]
    Generation(String),

    /// Conversation persistence failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an embedding service error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::EmbeddingService(message.into())
    }

    /// Create an index error
    pub fn index(message: impl Into<String>) -> Self {
        Self::IndexUnavailable(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable machine-readable kind, also used in reply error signals
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::UnsupportedFormat(_) => "unsupported_format",
            Error::FileTooLarge { .. } => "file_too_large",
            Error::FileParse { .. } => "parse_error",
            Error::Validation(_) => "validation_error",
            Error::EmbeddingService(_) => "embedding_error",
            Error::IndexUnavailable(_) => "index_unavailable",
            Error::Generation(_) => "generation_error",
            Error::Persistence(_) => "persistence_error",
            Error::DocumentNotFound(_) => "not_found",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::UnsupportedFormat(_) | Error::Validation(_) | Error::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::FileParse { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::EmbeddingService(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::IndexUnavailable(_) | Error::Generation(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            Error::Config(_) | Error::Persistence(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Error::DocumentNotFound(id) => format!("Document not found: {}", id),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", message);
        }

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_client_errors() {
        assert_eq!(
            Error::UnsupportedFormat(".exe".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::FileTooLarge { size: 11, max: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(Error::validation("empty").kind(), "validation_error");
    }

    #[test]
    fn test_generation_error_kind() {
        let err = Error::generation("timed out");
        assert_eq!(err.kind(), "generation_error");
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.to_string().contains("timed out"));
    }
}
