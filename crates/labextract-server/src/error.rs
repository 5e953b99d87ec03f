//! HTTP error responses with a `{"detail": ...}` body.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use labextract_core::{Error, ErrorResponse};

/// Prefix for server errors that were not already classified.
const PROCESSING_PREFIX: &str = "Error processing file: ";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let detail = if err.is_classified() {
            err.to_string()
        } else {
            format!("{}{}", PROCESSING_PREFIX, err)
        };

        if err.is_client_error() {
            tracing::warn!(status = status.as_u16(), "Rejected upload: {}", detail);
        } else {
            tracing::error!(status = status.as_u16(), "Extraction failed: {}", detail);
        }

        Self { status, detail }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        let detail = err.body_text();
        if status.is_client_error() {
            tracing::warn!(status = status.as_u16(), "Bad multipart body: {}", detail);
        } else {
            tracing::error!(status = status.as_u16(), "Failed to read upload: {}", detail);
        }
        Self { status, detail }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { detail: self.detail })).into_response()
    }
}
