//! API request handlers

pub mod activity;
pub mod keys;
pub mod pending;
pub mod settings;
pub mod verifications;

pub use activity::{generate_device_id, get_activity, get_summary, ActivityQuery, DeviceIdResponse};
pub use keys::{create_key, delete_key, get_key, get_key_by_number, list_keys, update_key, DeviceScope};
pub use pending::{
    complete_pending_verification, create_pending_verification, create_random_pending_verification,
    get_active_pending_verification, list_pending_verifications,
};
pub use settings::{get_settings, update_settings, SettingsQuery};
pub use verifications::{create_verification, list_verifications};

use std::sync::Arc;

use crate::config::InventoryConfig;
use crate::core::{InventoryReader, VerificationWorkflow};
use crate::storage::InventoryStore;

/// Application state shared across handlers
#[derive(Debug)]
pub struct AppState {
    /// Storage backend chosen at startup
    pub store: Arc<dyn InventoryStore>,
    /// Write-side verification rules
    pub workflow: VerificationWorkflow,
    /// Read-side views
    pub reader: InventoryReader,
}

impl AppState {
    pub fn new(store: Arc<dyn InventoryStore>, config: InventoryConfig) -> Self {
        Self {
            workflow: VerificationWorkflow::new(store.clone()),
            reader: InventoryReader::new(store.clone(), config),
            store,
        }
    }
}
