//! Read models computed from stored keys

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{derive_status, DisplayStatus};
use crate::types::{Key, KeyStatus, PendingVerification};

/// A key together with its derived display state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyView {
    #[serde(flatten)]
    pub key: Key,
    pub display_status: DisplayStatus,
    pub is_verified: bool,
    pub is_missing: bool,
    /// An open pending verification targets this key
    pub is_pending: bool,
}

impl KeyView {
    pub fn new(key: Key, now: DateTime<Utc>, threshold: Duration, is_pending: bool) -> Self {
        let display_status = derive_status(key.last_verified, now, threshold);
        Self {
            key,
            display_status,
            is_verified: display_status == DisplayStatus::Verified,
            is_missing: display_status == DisplayStatus::Missing,
            is_pending,
        }
    }

    /// Build views for every key, marking the ones targeted by an open request
    pub fn build_all(
        keys: Vec<Key>,
        open_pending: &[PendingVerification],
        now: DateTime<Utc>,
        threshold: Duration,
    ) -> Vec<KeyView> {
        keys.into_iter()
            .map(|key| {
                let is_pending = open_pending
                    .iter()
                    .any(|p| p.is_open() && p.key_id == key.id);
                KeyView::new(key, now, threshold, is_pending)
            })
            .collect()
    }
}

/// Query filter for key listings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyQuery {
    /// `verified`/`missing` match the display status, `available` matches
    /// keys whose stored status is still available
    pub status: Option<KeyStatus>,
    /// Case-insensitive substring of key number or location
    pub search: Option<String>,
    /// Scope the freshness threshold to this device's settings
    pub device_id: Option<String>,
}

impl KeyQuery {
    pub fn matches(&self, view: &KeyView) -> bool {
        let status_ok = match self.status {
            None => true,
            Some(KeyStatus::Verified) => view.is_verified,
            Some(KeyStatus::Missing) => view.is_missing,
            Some(KeyStatus::Available) => view.key.status == KeyStatus::Available,
        };

        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                view.key.key_number.to_lowercase().contains(&term)
                    || view.key.location_name.to_lowercase().contains(&term)
            }
        };

        status_ok && search_ok
    }
}

/// Counts shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub total_keys: usize,
    pub verified_keys: usize,
    pub missing_keys: usize,
    pub pending_requests: usize,
    /// verified / total, as a percentage; 0 when there are no keys
    pub verification_rate: f64,
}

impl InventorySummary {
    pub fn from_views(views: &[KeyView], pending_requests: usize) -> Self {
        let total_keys = views.len();
        let verified_keys = views.iter().filter(|v| v.is_verified).count();
        let verification_rate = if total_keys == 0 {
            0.0
        } else {
            verified_keys as f64 * 100.0 / total_keys as f64
        };

        Self {
            total_keys,
            verified_keys,
            missing_keys: total_keys - verified_keys,
            pending_requests,
            verification_rate,
        }
    }
}
