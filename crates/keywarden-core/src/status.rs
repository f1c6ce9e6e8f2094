//! Display status derivation
//!
//! A key's display status is a read-time function of how long ago it was
//! last verified. It is never stored.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Hours a verification stays fresh when no device setting applies
pub const DEFAULT_STATUS_THRESHOLD_HOURS: i64 = 24;

/// Freshness window used when no device setting applies
pub fn default_threshold() -> Duration {
    Duration::hours(DEFAULT_STATUS_THRESHOLD_HOURS)
}

/// Display status of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Verified,
    Missing,
}

/// Derive the display status of a key.
///
/// Returns `Missing` if the key was never verified or if at least `threshold`
/// has elapsed since `last_verified`; `Verified` otherwise. A `last_verified`
/// in the future (clock skew between writers) counts as fresh.
pub fn derive_status(
    last_verified: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> DisplayStatus {
    match last_verified {
        Some(at) if now.signed_duration_since(at) < threshold => DisplayStatus::Verified,
        _ => DisplayStatus::Missing,
    }
}
