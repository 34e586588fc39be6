//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use crate::store::BlockError;
use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// All errors that can occur in the application are represented by this enum.
/// Each variant implements automatic conversion to HTTP responses via `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Contact with the given ID does not exist in the namespace
    #[error("Contact not found: {0}")]
    ContactNotFound(String),

    /// File with the given ID does not exist in the namespace
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Request parameters or body are invalid
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Uploaded payload exceeds the configured ceiling
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status this error renders with
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ContactNotFound(_) | AppError::FileNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BlockError> for AppError {
    fn from(err: BlockError) -> Self {
        match err {
            BlockError::TooLarge { limit } => {
                AppError::PayloadTooLarge(format!("upload exceeds {} bytes", limit))
            }
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(format!("Malformed multipart body: {}", err.body_text()))
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::ContactNotFound("c1".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::FileNotFound("f1".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::BadRequest("limit".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::PayloadTooLarge("big".into()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_block_error_conversion() {
        let err: AppError = BlockError::TooLarge { limit: 10 }.into();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));

        let io = std::io::Error::other("disk gone");
        let err: AppError = BlockError::Io(io).into();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::FileNotFound("abc".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
