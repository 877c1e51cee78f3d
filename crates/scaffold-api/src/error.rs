//! HTTP error type: a status code plus a `{"error": message}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use scaffold_core::ErrorResponse;

pub const UNAUTHORIZED: &str = "Unauthorized";
pub const INVALID_QUERY: &str = "Invalid query";
pub const INVALID_IMAGE_DATA: &str = "Invalid image data";
pub const INVALID_DATA: &str = "Invalid data";
pub const INVALID_TOKEN_DATA: &str = "Invalid token data";
pub const IMAGE_NOT_FOUND: &str = "Image not found";
pub const TOKEN_NOT_FOUND: &str = "Token not found";
pub const FAILED_INSERT_IMAGE: &str = "Failed to insert image";
pub const FAILED_UPDATE_IMAGE: &str = "Failed to update image";
pub const FAILED_REMOVE_IMAGE: &str = "Failed to remove image";
pub const FAILED_INSERT_TOKEN: &str = "Failed to insert token";
pub const FAILED_REMOVE_TOKEN: &str = "Failed to remove token";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    /// Log the underlying failure and answer with a fixed message.
    pub fn internal(message: &'static str, cause: &scaffold_core::Error) -> Self {
        error!(error = %cause, "{}", message);
        ApiError::Internal(message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}
