//! Tenant record routes: query, insert, update, get, remove.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::info;

use scaffold_core::{
    Error, IdRequest, InsertRequest, InsertResponse, QueryRequest, RemoteRecord, SuccessResponse,
    UpdateRequest,
};

use super::{body, required};
use crate::auth::Tenant;
use crate::error::{
    ApiError, FAILED_INSERT_IMAGE, FAILED_REMOVE_IMAGE, FAILED_UPDATE_IMAGE, IMAGE_NOT_FOUND,
    INVALID_IMAGE_DATA, INVALID_QUERY,
};
use crate::AppState;

pub async fn query(
    State(state): State<AppState>,
    Tenant(owner): Tenant,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Vec<RemoteRecord>>, ApiError> {
    let request = body(payload, INVALID_QUERY)?;
    let query = required(request.query).ok_or(ApiError::BadRequest(INVALID_QUERY))?;
    Ok(Json(state.index.search(&owner, &query).await))
}

pub async fn insert(
    State(state): State<AppState>,
    Tenant(owner): Tenant,
    payload: Result<Json<InsertRequest>, JsonRejection>,
) -> Result<Json<InsertResponse>, ApiError> {
    let request = body(payload, INVALID_IMAGE_DATA)?;
    let (Some(title), Some(tags)) = (required(request.title), request.tags) else {
        return Err(ApiError::BadRequest(INVALID_IMAGE_DATA));
    };

    let cloud_id = state
        .index
        .insert(&owner, title, tags)
        .await
        .map_err(|e| ApiError::internal(FAILED_INSERT_IMAGE, &e))?;

    info!(subsystem = "api", op = "insert", owner = %owner, cloud_id = %cloud_id, "Record stored");
    Ok(Json(InsertResponse {
        success: true,
        cloud_id,
    }))
}

/// Replace title and tags of an existing record; the cloud id is unchanged.
pub async fn update(
    State(state): State<AppState>,
    Tenant(owner): Tenant,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<InsertResponse>, ApiError> {
    let request = body(payload, INVALID_IMAGE_DATA)?;
    let (Some(id), Some(title), Some(tags)) =
        (required(request.id), required(request.title), request.tags)
    else {
        return Err(ApiError::BadRequest(INVALID_IMAGE_DATA));
    };

    match state.index.update(&owner, &id, title, tags).await {
        Ok(()) => Ok(Json(InsertResponse {
            success: true,
            cloud_id: id,
        })),
        Err(Error::NotFound(_)) => Err(ApiError::NotFound(IMAGE_NOT_FOUND)),
        Err(e) => Err(ApiError::internal(FAILED_UPDATE_IMAGE, &e)),
    }
}

pub async fn get(
    State(state): State<AppState>,
    Tenant(owner): Tenant,
    payload: Result<Json<IdRequest>, JsonRejection>,
) -> Result<Json<RemoteRecord>, ApiError> {
    let request = body(payload, INVALID_IMAGE_DATA)?;
    let id = required(request.id).ok_or(ApiError::BadRequest(INVALID_IMAGE_DATA))?;
    state
        .index
        .get(&owner, &id)
        .await
        .map(Json)
        .map_err(|_| ApiError::NotFound(IMAGE_NOT_FOUND))
}

/// Delete a record. Records owned by other tenants answer exactly like
/// missing ones.
pub async fn remove(
    State(state): State<AppState>,
    Tenant(owner): Tenant,
    payload: Result<Json<IdRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let request = body(payload, INVALID_IMAGE_DATA)?;
    let id = required(request.id).ok_or(ApiError::BadRequest(INVALID_IMAGE_DATA))?;

    match state.index.remove(&owner, &id).await {
        Ok(()) => {
            info!(subsystem = "api", op = "remove", owner = %owner, cloud_id = %id, "Record removed");
            Ok(Json(SuccessResponse::ok()))
        }
        Err(Error::NotFound(_)) => Err(ApiError::NotFound(IMAGE_NOT_FOUND)),
        Err(e) => Err(ApiError::internal(FAILED_REMOVE_IMAGE, &e)),
    }
}
