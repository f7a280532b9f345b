//! Error types for the RAG pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation attempted before `initialize()` completed
    #[error("RAG pipeline not initialized. Call initialize() first.")]
    NotInitialized,

    /// File type the chunker cannot load
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Chunk metadata that is not a flat mapping of scalars
    #[error("Invalid chunk metadata: {0}")]
    InvalidMetadata(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index error
    #[error("Vector index error: {0}")]
    VectorDb(String),

    /// Relevance model error
    #[error("Reranking failed: {0}")]
    Rerank(String),

    /// Ollama/LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// A document produced nothing to index
    #[error("{0}")]
    Ingestion(String),

    /// Malformed client request
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

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

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

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector index error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create a reranking error
    pub fn rerank(message: impl Into<String>) -> Self {
        Self::Rerank(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the caller may retry once the pipeline is ready
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::NotInitialized)
    }

    /// Short machine-readable kind, used in HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::NotInitialized => "not_initialized",
            Error::UnsupportedFileType(_) => "unsupported_type",
            Error::FileParse { .. } => "parse_error",
            Error::InvalidMetadata(_) => "invalid_metadata",
            Error::Embedding(_) => "embedding_error",
            Error::VectorDb(_) => "vector_db_error",
            Error::Rerank(_) => "rerank_error",
            Error::Llm(_) => "llm_error",
            Error::Ingestion(_) => "ingestion_failed",
            Error::BadRequest(_) => "bad_request",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Database(_) => "database_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error at the API boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "detail": self.to_string(),
            "type": self.kind(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Error::NotInitialized.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::llm("connection refused").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::file_parse("a.pdf", "broken").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::BadRequest("missing file".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_not_initialized_is_distinct() {
        assert!(Error::NotInitialized.is_not_initialized());
        assert!(!Error::internal("boom").is_not_initialized());
        assert_eq!(Error::NotInitialized.kind(), "not_initialized");
    }
}
