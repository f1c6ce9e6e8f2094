//! # Keywarden Core
//!
//! Domain types and rules for tracking physical keys and confirming that
//! they are where they should be.
//!
//! ## Key Concepts
//!
//! - **Key**: a registered physical key, identified by a unique key number
//! - **Verification**: an append-only record that a key was physically checked
//! - **Pending verification**: an open request to check a key. At most one is
//!   open across the whole system at any time
//! - **Display status**: `verified` or `missing`, derived at read time from how
//!   long ago the key was last verified
//!
//! This crate has no I/O. Storage and HTTP live in `keywarden-server`.

pub mod activity;
pub mod error;
pub mod status;
pub mod types;
pub mod view;

pub use activity::{assemble_feed, ActivityItem, ActivitySource, ActivityStatus, DEFAULT_ACTIVITY_LIMIT};
pub use error::{FieldError, KeywardenError, Result};
pub use status::{default_threshold, derive_status, DisplayStatus, DEFAULT_STATUS_THRESHOLD_HOURS};
pub use types::{
    ActivePendingVerification, Key, KeyPatch, KeyStatus, NewKey, NewPendingVerification,
    NewVerification, PendingFilter, PendingVerification, Setting, SettingsPatch,
    SettingsTemplate, Verification, VerificationFilter,
};
pub use view::{InventorySummary, KeyQuery, KeyView};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
