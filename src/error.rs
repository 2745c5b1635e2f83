//! Error handling for the parkwatch server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown area or missing resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Client-side validation error
    #[error("{0}")]
    Validation(String),

    /// Image decode failure
    #[error("Processing failed: {0}")]
    Decode(String),

    /// Model inference failure
    #[error("Processing failed: {0}")]
    Inference(String),

    /// Image encode failure
    #[error("Processing failed: {0}")]
    Encode(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = self.to_string();

        tracing::error!(
            status = %status,
            message = %message,
            "Request error"
        );

        let body = Json(json!({ "error": message }));

        (status, body).into_response()
    }
}
