//! Error types for the upload / index / query service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::Path;
use thiserror::Error;

fn gib(bytes: &u64) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration, including missing dispatch entries
    #[error("Configuration error: {0}")]
    Config(String),

    /// The resolver could not classify the file
    #[error("Unsupported document kind: {0}")]
    UnsupportedKind(String),

    /// A document loader failed
    #[error("Failed to load '{path}': {message}")]
    Ingestion { path: String, message: String },

    /// Splitting produced no chunks
    #[error("No text chunks could be produced from {0}")]
    EmptyDocument(String),

    /// Embedding or index build failure
    #[error("Failed to build vector index: {0}")]
    Transformation(String),

    /// Query issued before any successful upload
    #[error("No document loaded. Please upload a file first.")]
    NoIndex,

    /// Bad query text
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Upload exceeded the configured maximum
    #[error(
        "File too large. Maximum size is {:.1}GB. Your file is {:.2}GB",
        gib(.limit),
        gib(.observed)
    )]
    SizeLimitExceeded { limit: u64, observed: u64 },

    /// Unknown background job
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Embedding provider error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Malformed request
    #[error("Bad request: {0}")]
    BadRequest(String),

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
    /// Create an ingestion error for a file path
    pub fn ingestion(path: &Path, message: impl Into<String>) -> Self {
        Self::Ingestion {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Short machine-readable tag used in error bodies
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::UnsupportedKind(_) => "unsupported_kind",
            Error::Ingestion { .. } => "ingestion_error",
            Error::EmptyDocument(_) => "empty_document",
            Error::Transformation(_) => "transformation_error",
            Error::NoIndex => "no_index",
            Error::InvalidQuery(_) => "invalid_query",
            Error::SizeLimitExceeded { .. } => "size_limit_exceeded",
            Error::JobNotFound(_) => "not_found",
            Error::Embedding(_) => "embedding_error",
            Error::Llm(_) => "llm_error",
            Error::BadRequest(_) => "bad_request",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::SizeLimitExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::JobNotFound(_) => StatusCode::NOT_FOUND,
            Error::NoIndex | Error::InvalidQuery(_) | Error::BadRequest(_) | Error::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::UnsupportedKind(_) | Error::EmptyDocument(_) | Error::Ingestion { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::Llm(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_)
            | Error::Transformation(_)
            | Error::Embedding(_)
            | Error::Io(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        let body = Json(json!({
            "error": {
                "type": self.kind_tag(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limit_message() {
        let err = Error::SizeLimitExceeded {
            limit: 1024 * 1024 * 1024,
            observed: 1024 * 1024 * 1024 + 1,
        };
        assert_eq!(
            err.to_string(),
            "File too large. Maximum size is 1.0GB. Your file is 1.00GB"
        );
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::NoIndex.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::InvalidQuery("empty".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::JobNotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::UnsupportedKind("bin".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::Config("missing".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
