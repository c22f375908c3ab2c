//! Error types for the screenshot search service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Service-level errors that can occur during operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Failed to connect to document store: {0}")]
    StorageConnect(String),

    #[error("Failed to write to document store: {0}")]
    StorageWrite(String),

    #[error("Failed to read from document store: {0}")]
    StorageRead(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status code the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::StorageConnect(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::StorageWrite(_) | ServiceError::StorageRead(_) => StatusCode::BAD_GATEWAY,
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::DimensionMismatch { .. } | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
