//! Core logic for Keywarden
//!
//! - `workflow`: the write side (requesting, recording and completing checks)
//! - `inventory`: the read side (display status, activity feed, summary)

mod inventory;
mod workflow;

pub use inventory::InventoryReader;
pub use workflow::VerificationWorkflow;

use keywarden_core::PendingVerification;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors raised by the workflow and inventory services
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Key {0} not found")]
    KeyNotFound(i64),

    #[error("Key number '{0}' not found")]
    KeyNumberNotFound(String),

    #[error("Pending verification {0} not found")]
    PendingNotFound(i64),

    #[error("No active pending verification")]
    NoActivePending,

    #[error("No keys are registered")]
    NoKeys,

    /// Another request is already open (for any key)
    #[error("Pending verification {} is still open", .0.id)]
    PendingConflict(Box<PendingVerification>),

    #[error("Pending verification {} is already completed", .0.id)]
    AlreadyCompleted(Box<PendingVerification>),

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for WorkflowError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::PendingConflict(open) => WorkflowError::PendingConflict(open),
            StorageError::AlreadyCompleted(done) => WorkflowError::AlreadyCompleted(done),
            other => WorkflowError::Storage(other),
        }
    }
}
