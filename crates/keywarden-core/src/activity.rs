//! Activity feed assembly
//!
//! The feed interleaves completed checks and open requests, newest first.
//! Both sources are merged before truncation so a burst on one side cannot
//! crowd out recent entries from the other.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::{Key, KeyStatus, PendingVerification, Verification};

/// Number of feed entries returned when the caller does not ask for more
pub const DEFAULT_ACTIVITY_LIMIT: usize = 8;

/// Where an activity entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivitySource {
    Verification,
    Pending,
}

/// Status shown for an activity entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Available,
    Verified,
    Missing,
    Pending,
}

impl From<KeyStatus> for ActivityStatus {
    fn from(status: KeyStatus) -> Self {
        match status {
            KeyStatus::Available => ActivityStatus::Available,
            KeyStatus::Verified => ActivityStatus::Verified,
            KeyStatus::Missing => ActivityStatus::Missing,
        }
    }
}

/// One line of the activity feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    /// Id of the underlying verification or pending row
    pub id: i64,
    pub source: ActivitySource,
    pub key_id: i64,
    pub key_number: String,
    pub status: ActivityStatus,
    pub timestamp: DateTime<Utc>,
}

/// Merge verifications and open pending requests into a feed of at most
/// `limit` entries, newest first.
///
/// Completed pending rows are ignored. Entries whose key is not in `keys` are
/// dropped. Equal timestamps put pending entries first, then higher ids.
pub fn assemble_feed(
    keys: &[Key],
    verifications: &[Verification],
    pending: &[PendingVerification],
    limit: usize,
) -> Vec<ActivityItem> {
    let key_numbers: HashMap<i64, &str> = keys
        .iter()
        .map(|k| (k.id, k.key_number.as_str()))
        .collect();

    let checks = verifications.iter().filter_map(|v| {
        key_numbers.get(&v.key_id).map(|number| ActivityItem {
            id: v.id,
            source: ActivitySource::Verification,
            key_id: v.key_id,
            key_number: number.to_string(),
            status: v.status.into(),
            timestamp: v.verified_at,
        })
    });

    let requests = pending.iter().filter(|p| p.is_open()).filter_map(|p| {
        key_numbers.get(&p.key_id).map(|number| ActivityItem {
            id: p.id,
            source: ActivitySource::Pending,
            key_id: p.key_id,
            key_number: number.to_string(),
            status: ActivityStatus::Pending,
            timestamp: p.requested_at,
        })
    });

    let mut feed: Vec<ActivityItem> = checks.chain(requests).collect();
    feed.sort_by(newest_first);
    feed.truncate(limit);
    feed
}

fn newest_first(a: &ActivityItem, b: &ActivityItem) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| source_rank(a.source).cmp(&source_rank(b.source)))
        .then_with(|| b.id.cmp(&a.id))
}

fn source_rank(source: ActivitySource) -> u8 {
    match source {
        ActivitySource::Pending => 0,
        ActivitySource::Verification => 1,
    }
}
