//! Verification workflow
//!
//! Enforces the single-open-request rule and applies the side effects of a
//! recorded check. Every mutation is delegated to one atomic store call; this
//! layer decides timestamps, translates store outcomes and logs.

use chrono::Utc;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{info, warn};

use keywarden_core::{ActivePendingVerification, NewVerification, PendingVerification};

use super::WorkflowError;
use crate::storage::{InventoryStore, RecordedVerification, StorageError};

/// Write-side service for verification requests and records
#[derive(Debug, Clone)]
pub struct VerificationWorkflow {
    store: Arc<dyn InventoryStore>,
}

impl VerificationWorkflow {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Open a request to check `key_id`.
    ///
    /// Fails with `KeyNotFound` for an unknown key and with `PendingConflict`
    /// while any other request is open.
    pub async fn request_verification(
        &self,
        key_id: i64,
    ) -> Result<PendingVerification, WorkflowError> {
        match self.store.create_pending(key_id, Utc::now()).await {
            Ok(request) => {
                info!(pending_id = request.id, key_id, "Verification requested");
                Ok(request)
            }
            Err(StorageError::NotFound(_)) => {
                warn!(key_id, "Verification requested for unknown key");
                Err(WorkflowError::KeyNotFound(key_id))
            }
            Err(StorageError::PendingConflict(open)) => {
                warn!(
                    key_id,
                    open_pending_id = open.id,
                    open_key_id = open.key_id,
                    "Verification request rejected, another request is open"
                );
                Err(WorkflowError::PendingConflict(open))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Open a request for a key chosen uniformly at random
    pub async fn request_random_verification(&self) -> Result<PendingVerification, WorkflowError> {
        let keys = self.store.list_keys().await?;
        let key_id = keys
            .choose(&mut rand::thread_rng())
            .map(|k| k.id)
            .ok_or(WorkflowError::NoKeys)?;
        self.request_verification(key_id).await
    }

    /// Record that a key was checked.
    ///
    /// Updates the key's `lastVerified`/`status` and closes the open request
    /// for this key, if there is one.
    pub async fn record_verification(
        &self,
        verification: NewVerification,
    ) -> Result<RecordedVerification, WorkflowError> {
        let key_id = verification.key_id;
        match self.store.record_verification(verification, Utc::now()).await {
            Ok(recorded) => Ok(recorded),
            Err(StorageError::NotFound(_)) => {
                warn!(key_id, "Verification submitted for unknown key");
                Err(WorkflowError::KeyNotFound(key_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Close a request without recording a verification.
    ///
    /// Completing an already completed request fails with `AlreadyCompleted`
    /// and changes nothing.
    pub async fn complete_pending_verification(
        &self,
        id: i64,
    ) -> Result<PendingVerification, WorkflowError> {
        match self.store.complete_pending(id, Utc::now()).await? {
            Some(done) => Ok(done),
            None => Err(WorkflowError::PendingNotFound(id)),
        }
    }

    /// The open request joined with the key it targets
    pub async fn active_pending_verification(
        &self,
    ) -> Result<ActivePendingVerification, WorkflowError> {
        let pending = self
            .store
            .get_active_pending()
            .await?
            .ok_or(WorkflowError::NoActivePending)?;
        let key = self
            .store
            .get_key(pending.key_id)
            .await?
            .ok_or(WorkflowError::KeyNotFound(pending.key_id))?;
        Ok(ActivePendingVerification { pending, key })
    }
}
