//! Dashboard and utility handlers

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use keywarden_core::{ActivityItem, InventorySummary};

use crate::api::error::ApiError;
use crate::api::handlers::keys::DeviceScope;
use crate::api::handlers::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

/// Recent verifications and open requests, newest first
///
/// GET /api/activity?limit=
pub async fn get_activity(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ActivityQuery>, QueryRejection>,
) -> Result<Json<Vec<ActivityItem>>, ApiError> {
    let Query(query) = query?;
    Ok(Json(state.reader.activity_feed(query.limit).await?))
}

/// GET /api/summary?deviceId=
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    scope: Result<Query<DeviceScope>, QueryRejection>,
) -> Result<Json<InventorySummary>, ApiError> {
    let Query(scope) = scope?;
    Ok(Json(state.reader.summary(scope.device_id.as_deref()).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdResponse {
    pub device_id: String,
}

/// Issue a fresh random device identifier
///
/// GET /api/generate-device-id
pub async fn generate_device_id() -> Json<DeviceIdResponse> {
    Json(DeviceIdResponse {
        device_id: uuid::Uuid::new_v4().to_string(),
    })
}
