//! Key registration and lookup handlers

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use keywarden_core::{KeyPatch, KeyQuery, KeyView, NewKey};

use crate::api::error::ApiError;
use crate::api::handlers::AppState;

/// Optional device scope for single-key reads
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceScope {
    pub device_id: Option<String>,
}

/// List keys with their derived status
///
/// GET /api/keys?status=&search=&deviceId=
pub async fn list_keys(
    State(state): State<Arc<AppState>>,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> Result<Json<Vec<KeyView>>, ApiError> {
    let Query(query) = query?;
    Ok(Json(state.reader.key_views(&query).await?))
}

/// GET /api/keys/{id}
pub async fn get_key(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    scope: Result<Query<DeviceScope>, QueryRejection>,
) -> Result<Json<KeyView>, ApiError> {
    let Path(id) = id?;
    let Query(scope) = scope?;
    Ok(Json(state.reader.key_view(id, scope.device_id.as_deref()).await?))
}

/// Look a key up by the number printed on its tag
///
/// GET /api/keys/by-number/{key_number}
pub async fn get_key_by_number(
    State(state): State<Arc<AppState>>,
    key_number: Result<Path<String>, PathRejection>,
    scope: Result<Query<DeviceScope>, QueryRejection>,
) -> Result<Json<KeyView>, ApiError> {
    let Path(key_number) = key_number?;
    let Query(scope) = scope?;
    Ok(Json(
        state
            .reader
            .key_view_by_number(&key_number, scope.device_id.as_deref())
            .await?,
    ))
}

/// Register a key
///
/// POST /api/keys
pub async fn create_key(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewKey>, JsonRejection>,
) -> Result<(StatusCode, Json<keywarden_core::Key>), ApiError> {
    let Json(new_key) = payload?;
    new_key.validate()?;

    let key = state.store.create_key(new_key).await?;
    info!(key_id = key.id, key_number = %key.key_number, "Key registered");
    Ok((StatusCode::CREATED, Json(key)))
}

/// Partially update a key
///
/// PUT /api/keys/{id}
pub async fn update_key(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<KeyPatch>, JsonRejection>,
) -> Result<Json<keywarden_core::Key>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    patch.validate()?;

    state
        .store
        .update_key(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Key not found".into()))
}

/// Delete a key that has no verification history
///
/// DELETE /api/keys/{id}
pub async fn delete_key(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    if state.store.delete_key(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Key not found".into()))
    }
}
