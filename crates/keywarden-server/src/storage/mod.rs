//! Storage abstraction for Keywarden
//!
//! This module provides a trait-based abstraction for inventory storage,
//! enabling both in-memory (default) and persistent (PostgreSQL) backends.
//! The backend is chosen once at startup.
//!
//! Multi-step mutations are single trait methods so each backend can make
//! them atomic:
//! - `create_pending` checks for an open request and inserts in one step
//! - `record_verification` appends the record, updates the key and closes the
//!   matching open request together
//! - `get_or_create_settings` never creates two rows for one device

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keywarden_core::{
    Key, KeyPatch, NewKey, NewVerification, PendingFilter, PendingVerification, Setting,
    SettingsPatch, SettingsTemplate, Verification, VerificationFilter,
};
use std::fmt::Debug;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// An open pending verification already exists
    #[error("Pending verification {} is still open", .0.id)]
    PendingConflict(Box<PendingVerification>),

    /// The pending verification was completed earlier
    #[error("Pending verification {} is already completed", .0.id)]
    AlreadyCompleted(Box<PendingVerification>),

    /// The row is referenced by other rows and cannot be removed
    #[error("Still referenced: {0}")]
    Referenced(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Everything a single `record_verification` call changed
#[derive(Debug, Clone)]
pub struct RecordedVerification {
    pub verification: Verification,
    /// The key after `lastVerified`/`status` were updated
    pub key: Key,
    /// The open request for this key that was closed, if there was one
    pub closed_pending: Option<PendingVerification>,
}

/// Settings row plus whether this call created it
#[derive(Debug, Clone)]
pub struct SettingsLookup {
    pub setting: Setting,
    pub created: bool,
}

/// Storage backend trait for inventory state
///
/// Implementations must be thread-safe and support concurrent access.
/// Lookups of unknown ids return `Ok(None)` / `Ok(false)`, not an error.
#[async_trait]
pub trait InventoryStore: Send + Sync + Debug {
    // =========================================================================
    // Keys
    // =========================================================================

    /// All keys, ordered by id
    async fn list_keys(&self) -> Result<Vec<Key>, StorageError>;

    async fn get_key(&self, id: i64) -> Result<Option<Key>, StorageError>;

    async fn get_key_by_number(&self, key_number: &str) -> Result<Option<Key>, StorageError>;

    /// Register a key. Fails with `AlreadyExists` on a duplicate key number.
    async fn create_key(&self, key: NewKey) -> Result<Key, StorageError>;

    /// Merge `patch` into the key. Fails with `AlreadyExists` when the patch
    /// renames the key to a number held by another key.
    async fn update_key(&self, id: i64, patch: KeyPatch) -> Result<Option<Key>, StorageError>;

    /// Remove a key. Fails with `Referenced` while any verification or
    /// pending row points at it.
    async fn delete_key(&self, id: i64) -> Result<bool, StorageError>;

    // =========================================================================
    // Verifications
    // =========================================================================

    /// Matching verifications, newest first
    async fn list_verifications(
        &self,
        filter: &VerificationFilter,
    ) -> Result<Vec<Verification>, StorageError>;

    /// Append a verification stamped `at`, set the key's `lastVerified`/`status`
    /// and close the open request for that key, all in one step.
    /// Fails with `NotFound` if the key does not exist.
    async fn record_verification(
        &self,
        verification: NewVerification,
        at: DateTime<Utc>,
    ) -> Result<RecordedVerification, StorageError>;

    // =========================================================================
    // Settings
    // =========================================================================

    async fn get_settings(&self, device_id: &str) -> Result<Option<Setting>, StorageError>;

    /// Return the device's settings, creating them from `defaults` if absent
    async fn get_or_create_settings(
        &self,
        device_id: &str,
        defaults: SettingsTemplate,
    ) -> Result<SettingsLookup, StorageError>;

    async fn update_settings(
        &self,
        id: i64,
        patch: SettingsPatch,
    ) -> Result<Option<Setting>, StorageError>;

    // =========================================================================
    // Pending verifications
    // =========================================================================

    /// Matching pending verifications, ordered by id
    async fn list_pending(
        &self,
        filter: &PendingFilter,
    ) -> Result<Vec<PendingVerification>, StorageError>;

    async fn get_pending(&self, id: i64) -> Result<Option<PendingVerification>, StorageError>;

    /// The single open pending verification, if any
    async fn get_active_pending(&self) -> Result<Option<PendingVerification>, StorageError>;

    /// Open a request for `key_id` stamped `at`.
    ///
    /// Fails with `PendingConflict` if any request is open (for any key) and
    /// with `NotFound` if the key does not exist.
    async fn create_pending(
        &self,
        key_id: i64,
        at: DateTime<Utc>,
    ) -> Result<PendingVerification, StorageError>;

    /// Close an open request. Fails with `AlreadyCompleted` if it was closed
    /// before; the row is left unchanged in that case.
    async fn complete_pending(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<PendingVerification>, StorageError>;
}
