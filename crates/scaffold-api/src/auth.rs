//! Request authentication.
//!
//! Tenant routes resolve the `Authorization` header through the token store;
//! token administration routes compare it against the master secret.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// The user id a bearer token resolved to.
#[derive(Debug, Clone)]
pub struct Tenant(pub String);

/// Proof that the request carried the master secret.
#[derive(Debug, Clone, Copy)]
pub struct Master;

fn authorization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Tenant {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = authorization(parts)
            .map(|h| h.strip_prefix("Bearer ").unwrap_or(h).trim())
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        match state.tokens.resolve(token).await {
            Ok(Some(owner)) => Ok(Tenant(owner)),
            Ok(None) => {
                debug!(subsystem = "api", component = "auth", "Unknown token");
                Err(ApiError::Unauthorized)
            }
            Err(e) => Err(ApiError::internal("Failed to resolve token", &e)),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Master {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match (state.config.master_token.as_deref(), authorization(parts)) {
            (Some(secret), Some(given)) if secret == given => Ok(Master),
            _ => Err(ApiError::Unauthorized),
        }
    }
}
