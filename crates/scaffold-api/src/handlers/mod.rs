//! HTTP handlers for the remote store.
//!
//! Every failure answers with `{"error": message}` and a non-2xx status;
//! malformed JSON bodies get the same route-specific message as a body with
//! missing fields.

pub mod meta;
pub mod records;
pub mod tokens;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::ApiError;

/// Unwrap a JSON body, mapping a rejection to `BadRequest(message)`.
pub(crate) fn body<T>(
    payload: Result<Json<T>, JsonRejection>,
    message: &'static str,
) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|_| ApiError::BadRequest(message))
}

/// A present, non-blank string field.
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
