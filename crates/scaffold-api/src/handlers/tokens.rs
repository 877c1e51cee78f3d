//! Token administration, gated by the master secret.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::info;

use scaffold_core::{Error, SuccessResponse, TokenNewRequest, TokenNewResponse, TokenRemoveRequest};

use super::{body, required};
use crate::auth::Master;
use crate::error::{
    ApiError, FAILED_INSERT_TOKEN, FAILED_REMOVE_TOKEN, INVALID_DATA, INVALID_TOKEN_DATA,
    TOKEN_NOT_FOUND,
};
use crate::AppState;

pub async fn token_new(
    State(state): State<AppState>,
    _master: Master,
    payload: Result<Json<TokenNewRequest>, JsonRejection>,
) -> Result<Json<TokenNewResponse>, ApiError> {
    let request = body(payload, INVALID_DATA)?;
    let user_id = required(request.user_id).ok_or(ApiError::BadRequest(INVALID_DATA))?;

    let token = state
        .tokens
        .issue(&user_id)
        .await
        .map_err(|e| ApiError::internal(FAILED_INSERT_TOKEN, &e))?;

    info!(subsystem = "api", component = "tokens", op = "issue", owner = %user_id, "Token issued");
    Ok(Json(TokenNewResponse {
        success: true,
        token,
    }))
}

pub async fn token_remove(
    State(state): State<AppState>,
    _master: Master,
    payload: Result<Json<TokenRemoveRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let request = body(payload, INVALID_TOKEN_DATA)?;
    let token = required(request.token).ok_or(ApiError::BadRequest(INVALID_TOKEN_DATA))?;

    match state.tokens.revoke(&token).await {
        Ok(()) => {
            info!(subsystem = "api", component = "tokens", op = "revoke", "Token revoked");
            Ok(Json(SuccessResponse::ok()))
        }
        Err(Error::NotFound(_)) => Err(ApiError::NotFound(TOKEN_NOT_FOUND)),
        Err(e) => Err(ApiError::internal(FAILED_REMOVE_TOKEN, &e)),
    }
}
