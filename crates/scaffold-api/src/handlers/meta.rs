//! Unauthenticated informational routes.

use axum::Json;
use serde_json::{json, Value};

use scaffold_core::{VersionResponse, PROTOCOL_VERSION};

pub async fn greeting() -> &'static str {
    "Hello from the scaffold remote store!"
}

/// Server version; clients refuse to sync unless it equals theirs exactly.
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: PROTOCOL_VERSION.to_string(),
    })
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
