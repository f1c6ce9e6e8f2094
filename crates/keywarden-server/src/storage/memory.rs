//! In-memory storage backend
//!
//! Default storage implementation using in-memory maps.
//! Suitable for development, tests and single-instance deployments.
//! Data is lost on restart.
//!
//! Locks are always taken in the order keys → verifications → settings →
//! pending, so multi-table operations cannot deadlock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

use keywarden_core::{
    Key, KeyPatch, NewKey, NewVerification, PendingFilter, PendingVerification, Setting,
    SettingsPatch, SettingsTemplate, Verification, VerificationFilter,
};

use super::{InventoryStore, RecordedVerification, SettingsLookup, StorageError};

/// Rows of one entity type plus the next id to hand out
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Table<T> {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// In-memory inventory store implementation
#[derive(Debug)]
pub struct MemoryStore {
    keys: RwLock<Table<Key>>,
    verifications: RwLock<Table<Verification>>,
    settings: RwLock<Table<Setting>>,
    pending: RwLock<Table<PendingVerification>>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(Table::new()),
            verifications: RwLock::new(Table::new()),
            settings: RwLock::new(Table::new()),
            pending: RwLock::new(Table::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<G>(_: PoisonError<G>) -> StorageError {
    StorageError::Database("in-memory table lock poisoned".into())
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StorageError> {
    lock.read().map_err(poisoned)
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StorageError> {
    lock.write().map_err(poisoned)
}

fn number_taken(keys: &Table<Key>, key_number: &str, except: Option<i64>) -> bool {
    keys.rows
        .values()
        .any(|k| k.key_number == key_number && Some(k.id) != except)
}

#[async_trait]
impl InventoryStore for MemoryStore {
    // =========================================================================
    // Keys
    // =========================================================================

    async fn list_keys(&self) -> Result<Vec<Key>, StorageError> {
        let keys = read(&self.keys)?;
        Ok(keys.rows.values().cloned().collect())
    }

    async fn get_key(&self, id: i64) -> Result<Option<Key>, StorageError> {
        let keys = read(&self.keys)?;
        Ok(keys.rows.get(&id).cloned())
    }

    async fn get_key_by_number(&self, key_number: &str) -> Result<Option<Key>, StorageError> {
        let keys = read(&self.keys)?;
        let key_number = key_number.trim();
        Ok(keys
            .rows
            .values()
            .find(|k| k.key_number == key_number)
            .cloned())
    }

    async fn create_key(&self, key: NewKey) -> Result<Key, StorageError> {
        let mut keys = write(&self.keys)?;
        if number_taken(&keys, key.key_number.trim(), None) {
            return Err(StorageError::AlreadyExists(format!(
                "key number '{}'",
                key.key_number.trim()
            )));
        }

        let id = keys.allocate_id();
        let key = key.into_key(id);
        info!(key_id = id, key_number = %key.key_number, "Registering key");
        keys.rows.insert(id, key.clone());
        Ok(key)
    }

    async fn update_key(&self, id: i64, patch: KeyPatch) -> Result<Option<Key>, StorageError> {
        let mut keys = write(&self.keys)?;
        if !keys.rows.contains_key(&id) {
            return Ok(None);
        }
        if let Some(ref key_number) = patch.key_number {
            if number_taken(&keys, key_number.trim(), Some(id)) {
                return Err(StorageError::AlreadyExists(format!(
                    "key number '{}'",
                    key_number.trim()
                )));
            }
        }

        let Some(key) = keys.rows.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(key);
        info!(key_id = id, "Updated key");
        Ok(Some(key.clone()))
    }

    async fn delete_key(&self, id: i64) -> Result<bool, StorageError> {
        let mut keys = write(&self.keys)?;
        if !keys.rows.contains_key(&id) {
            return Ok(false);
        }

        let verifications = read(&self.verifications)?;
        let pending = read(&self.pending)?;
        let history = verifications.rows.values().filter(|v| v.key_id == id).count();
        let requests = pending.rows.values().filter(|p| p.key_id == id).count();
        if history > 0 || requests > 0 {
            warn!(key_id = id, history, requests, "Refusing to delete referenced key");
            return Err(StorageError::Referenced(format!(
                "key {} has {} verification(s) and {} pending request(s)",
                id, history, requests
            )));
        }

        keys.rows.remove(&id);
        info!(key_id = id, "Deleted key");
        Ok(true)
    }

    // =========================================================================
    // Verifications
    // =========================================================================

    async fn list_verifications(
        &self,
        filter: &VerificationFilter,
    ) -> Result<Vec<Verification>, StorageError> {
        let verifications = read(&self.verifications)?;
        let mut matching: Vec<Verification> = verifications
            .rows
            .values()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.verified_at.cmp(&a.verified_at).then(b.id.cmp(&a.id)));
        Ok(matching)
    }

    async fn record_verification(
        &self,
        verification: NewVerification,
        at: DateTime<Utc>,
    ) -> Result<RecordedVerification, StorageError> {
        let mut keys = write(&self.keys)?;
        let mut verifications = write(&self.verifications)?;
        let mut pending = write(&self.pending)?;

        let Some(key) = keys.rows.get_mut(&verification.key_id) else {
            return Err(StorageError::NotFound(format!("key {}", verification.key_id)));
        };

        let id = verifications.allocate_id();
        let record = Verification {
            id,
            key_id: verification.key_id,
            verified_at: at,
            status: verification.status,
            device_id: verification.device_id,
        };
        verifications.rows.insert(id, record.clone());

        key.last_verified = Some(at);
        key.status = record.status;
        let key = key.clone();

        let closed_pending = pending
            .rows
            .values_mut()
            .find(|p| p.is_open() && p.key_id == record.key_id)
            .map(|p| {
                p.complete(at);
                p.clone()
            });

        info!(
            verification_id = id,
            key_id = record.key_id,
            status = %record.status,
            closed_pending = ?closed_pending.as_ref().map(|p| p.id),
            "Recorded verification"
        );

        Ok(RecordedVerification {
            verification: record,
            key,
            closed_pending,
        })
    }

    // =========================================================================
    // Settings
    // =========================================================================

    async fn get_settings(&self, device_id: &str) -> Result<Option<Setting>, StorageError> {
        let settings = read(&self.settings)?;
        Ok(settings
            .rows
            .values()
            .find(|s| s.device_id == device_id)
            .cloned())
    }

    async fn get_or_create_settings(
        &self,
        device_id: &str,
        defaults: SettingsTemplate,
    ) -> Result<SettingsLookup, StorageError> {
        let mut settings = write(&self.settings)?;
        if let Some(existing) = settings.rows.values().find(|s| s.device_id == device_id) {
            return Ok(SettingsLookup {
                setting: existing.clone(),
                created: false,
            });
        }

        let id = settings.allocate_id();
        let setting = defaults.into_setting(id, device_id);
        info!(settings_id = id, device_id = %device_id, "Created default settings");
        settings.rows.insert(id, setting.clone());
        Ok(SettingsLookup {
            setting,
            created: true,
        })
    }

    async fn update_settings(
        &self,
        id: i64,
        patch: SettingsPatch,
    ) -> Result<Option<Setting>, StorageError> {
        let mut settings = write(&self.settings)?;
        let Some(setting) = settings.rows.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(setting);
        info!(settings_id = id, "Updated settings");
        Ok(Some(setting.clone()))
    }

    // =========================================================================
    // Pending verifications
    // =========================================================================

    async fn list_pending(
        &self,
        filter: &PendingFilter,
    ) -> Result<Vec<PendingVerification>, StorageError> {
        let pending = read(&self.pending)?;
        Ok(pending
            .rows
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn get_pending(&self, id: i64) -> Result<Option<PendingVerification>, StorageError> {
        let pending = read(&self.pending)?;
        Ok(pending.rows.get(&id).cloned())
    }

    async fn get_active_pending(&self) -> Result<Option<PendingVerification>, StorageError> {
        let pending = read(&self.pending)?;
        Ok(pending.rows.values().find(|p| p.is_open()).cloned())
    }

    async fn create_pending(
        &self,
        key_id: i64,
        at: DateTime<Utc>,
    ) -> Result<PendingVerification, StorageError> {
        let keys = read(&self.keys)?;
        let mut pending = write(&self.pending)?;

        if !keys.rows.contains_key(&key_id) {
            return Err(StorageError::NotFound(format!("key {}", key_id)));
        }
        if let Some(open) = pending.rows.values().find(|p| p.is_open()) {
            return Err(StorageError::PendingConflict(Box::new(open.clone())));
        }

        let id = pending.allocate_id();
        let request = PendingVerification::open(id, key_id, at);
        info!(pending_id = id, key_id, "Opened pending verification");
        pending.rows.insert(id, request.clone());
        Ok(request)
    }

    async fn complete_pending(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<PendingVerification>, StorageError> {
        let mut pending = write(&self.pending)?;
        let Some(request) = pending.rows.get_mut(&id) else {
            return Ok(None);
        };
        if !request.is_open() {
            return Err(StorageError::AlreadyCompleted(Box::new(request.clone())));
        }

        request.complete(at);
        info!(pending_id = id, key_id = request.key_id, "Completed pending verification");
        Ok(Some(request.clone()))
    }
}
