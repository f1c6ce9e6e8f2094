//! Keywarden Server
//!
//! HTTP service for a physical key inventory:
//! - Registers keys and looks them up by id or key number
//! - Records verifications (a person confirmed the key is in place)
//! - Hands out verification requests, at most one open at a time
//! - Derives `verified`/`missing` from the age of the last verification
//!
//! ## API Endpoints
//!
//! ### Keys
//! - `GET /api/keys` - List keys with display status (`status`, `search`, `deviceId` filters)
//! - `POST /api/keys` - Register a key
//! - `GET /api/keys/{id}` - Fetch one key
//! - `PUT /api/keys/{id}` - Partially update a key
//! - `DELETE /api/keys/{id}` - Delete a key without history
//! - `GET /api/keys/by-number/{keyNumber}` - Fetch a key by its number
//!
//! ### Verifications
//! - `GET /api/verifications` - Verification history (`keyId`, `deviceId` filters)
//! - `POST /api/verifications` - Record a verification
//!
//! ### Pending verifications
//! - `GET /api/pending-verifications` - List requests (`keyId`, `completed` filters)
//! - `POST /api/pending-verifications` - Request a check of one key
//! - `POST /api/pending-verifications/random` - Request a check of a random key
//! - `GET /api/pending-verifications/active` - The open request and its key
//! - `PUT /api/pending-verifications/{id}/complete` - Close a request
//!
//! ### Settings and dashboard
//! - `GET /api/settings?deviceId=` - Device settings, created on first access
//! - `PUT /api/settings/{id}` - Update device settings
//! - `GET /api/activity` - Recent activity feed
//! - `GET /api/summary` - Inventory counts
//! - `GET /api/generate-device-id` - Fresh device identifier
//! - `GET /health` - Liveness check

pub mod api;
pub mod config;
pub mod core;
pub mod storage;

pub use api::create_router;
pub use api::handlers::AppState;
pub use config::{ConfigError, InventoryConfig, ServerConfig};
pub use core::{InventoryReader, VerificationWorkflow, WorkflowError};
pub use storage::{InventoryStore, MemoryStore, StorageError};

#[cfg(feature = "postgres")]
pub use storage::PostgresStore;
