//! Pending verification handlers
//!
//! At most one request is open at a time, system-wide. Clients poll
//! `/api/pending-verifications/active` to learn which key to check next.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use keywarden_core::{ActivePendingVerification, NewPendingVerification, PendingFilter, PendingVerification};

use crate::api::error::ApiError;
use crate::api::handlers::AppState;

/// GET /api/pending-verifications?keyId=&completed=
pub async fn list_pending_verifications(
    State(state): State<Arc<AppState>>,
    filter: Result<Query<PendingFilter>, QueryRejection>,
) -> Result<Json<Vec<PendingVerification>>, ApiError> {
    let Query(filter) = filter?;
    Ok(Json(state.store.list_pending(&filter).await?))
}

/// The open request joined with its key
///
/// GET /api/pending-verifications/active
pub async fn get_active_pending_verification(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ActivePendingVerification>, ApiError> {
    Ok(Json(state.workflow.active_pending_verification().await?))
}

/// Request that a key be checked
///
/// POST /api/pending-verifications
///
/// Returns 409 with the open request attached if one already exists.
pub async fn create_pending_verification(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewPendingVerification>, JsonRejection>,
) -> Result<(StatusCode, Json<PendingVerification>), ApiError> {
    let Json(request) = payload?;
    let pending = state.workflow.request_verification(request.key_id).await?;
    Ok((StatusCode::CREATED, Json(pending)))
}

/// Request that a randomly chosen key be checked
///
/// POST /api/pending-verifications/random
pub async fn create_random_pending_verification(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<PendingVerification>), ApiError> {
    let pending = state.workflow.request_random_verification().await?;
    Ok((StatusCode::CREATED, Json(pending)))
}

/// Close a request without recording a verification
///
/// PUT /api/pending-verifications/{id}/complete
pub async fn complete_pending_verification(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<PendingVerification>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.workflow.complete_pending_verification(id).await?))
}
