//! API error types and responses

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use keywarden_core::{FieldError, KeywardenError, PendingVerification};

use crate::core::WorkflowError;
use crate::storage::StorageError;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Pending verification already active")]
    PendingConflict(Box<PendingVerification>),

    #[error("Pending verification already completed")]
    AlreadyCompleted(Box<PendingVerification>),

    #[error("Key in use: {0}")]
    KeyInUse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// API error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Request failed validation".to_string(),
                Some(serde_json::json!({ "errors": errors })),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::AlreadyExists(msg) => (StatusCode::CONFLICT, "ALREADY_EXISTS", msg, None),
            ApiError::PendingConflict(open) => (
                StatusCode::CONFLICT,
                "PENDING_VERIFICATION_ACTIVE",
                "There's already an active pending verification".to_string(),
                Some(serde_json::json!({ "pendingVerification": open })),
            ),
            ApiError::AlreadyCompleted(done) => (
                StatusCode::CONFLICT,
                "ALREADY_COMPLETED",
                format!("Pending verification {} is already completed", done.id),
                Some(serde_json::json!({ "pendingVerification": done })),
            ),
            ApiError::KeyInUse(msg) => (StatusCode::CONFLICT, "KEY_IN_USE", msg, None),
            ApiError::Internal(msg) => {
                // Logged here, never echoed to the client
                error!(error = %msg, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<KeywardenError> for ApiError {
    fn from(err: KeywardenError) -> Self {
        ApiError::Validation(err.field_errors())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => ApiError::NotFound(msg),
            StorageError::AlreadyExists(msg) => ApiError::AlreadyExists(msg),
            StorageError::PendingConflict(open) => ApiError::PendingConflict(open),
            StorageError::AlreadyCompleted(done) => ApiError::AlreadyCompleted(done),
            StorageError::Referenced(msg) => ApiError::KeyInUse(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::KeyNotFound(_)
            | WorkflowError::KeyNumberNotFound(_)
            | WorkflowError::PendingNotFound(_)
            | WorkflowError::NoActivePending
            | WorkflowError::NoKeys => ApiError::NotFound(err.to_string()),
            WorkflowError::PendingConflict(open) => ApiError::PendingConflict(open),
            WorkflowError::AlreadyCompleted(done) => ApiError::AlreadyCompleted(done),
            WorkflowError::Storage(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(vec![FieldError::new("query", rejection.body_text())])
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(vec![FieldError::new("path", rejection.body_text())])
    }
}
