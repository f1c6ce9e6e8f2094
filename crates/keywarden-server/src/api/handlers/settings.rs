//! Per-device settings handlers

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use keywarden_core::{FieldError, Setting, SettingsPatch, SettingsTemplate};

use crate::api::error::ApiError;
use crate::api::handlers::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsQuery {
    pub device_id: Option<String>,
}

/// Fetch a device's settings, creating the defaults on first access
///
/// GET /api/settings?deviceId=
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SettingsQuery>, QueryRejection>,
) -> Result<Json<Setting>, ApiError> {
    let Query(query) = query?;
    let device_id = query
        .device_id
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| ApiError::Validation(vec![FieldError::new("deviceId", "Device ID is required")]))?;

    let lookup = state
        .store
        .get_or_create_settings(&device_id, SettingsTemplate::default())
        .await?;
    Ok(Json(lookup.setting))
}

/// PUT /api/settings/{id}
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SettingsPatch>, JsonRejection>,
) -> Result<Json<Setting>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    patch.validate()?;

    state
        .store
        .update_settings(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Settings not found".into()))
}
