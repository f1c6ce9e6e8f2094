//! Verification history handlers

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use keywarden_core::{NewVerification, Verification, VerificationFilter};

use crate::api::error::ApiError;
use crate::api::handlers::AppState;

/// GET /api/verifications?keyId=&deviceId=
pub async fn list_verifications(
    State(state): State<Arc<AppState>>,
    filter: Result<Query<VerificationFilter>, QueryRejection>,
) -> Result<Json<Vec<Verification>>, ApiError> {
    let Query(filter) = filter?;
    Ok(Json(state.store.list_verifications(&filter).await?))
}

/// Record a verification
///
/// POST /api/verifications
///
/// Also stamps the key's `lastVerified`/`status` and closes the open request
/// for this key, if there is one.
pub async fn create_verification(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewVerification>, JsonRejection>,
) -> Result<(StatusCode, Json<Verification>), ApiError> {
    let Json(verification) = payload?;
    let recorded = state.workflow.record_verification(verification).await?;
    Ok((StatusCode::CREATED, Json(recorded.verification)))
}
