//! Entity types shared by the store, the workflow and the HTTP layer
//!
//! Wire names are camelCase so payloads line up with what the mobile client
//! sends and expects.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{KeywardenError, Result, Validator};

/// Maximum length of a key number
pub const MAX_KEY_NUMBER_LEN: usize = 64;

/// Maximum length of free-text fields (location, prefix, description)
pub const MAX_TEXT_LEN: usize = 256;

// =============================================================================
// Key
// =============================================================================

/// Stored status of a key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    /// Registered but never verified
    #[default]
    Available,
    /// Last check found the key
    Verified,
    /// Last check did not find the key
    Missing,
}

impl KeyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStatus::Available => "available",
            KeyStatus::Verified => "verified",
            KeyStatus::Missing => "missing",
        }
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyStatus {
    type Err = KeywardenError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "available" => Ok(KeyStatus::Available),
            "verified" => Ok(KeyStatus::Verified),
            "missing" => Ok(KeyStatus::Missing),
            other => Err(KeywardenError::InvalidStatus(other.to_string())),
        }
    }
}

/// A tracked physical key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    pub id: i64,
    /// Human-entered number printed on the key tag; unique
    pub key_number: String,
    pub location_name: String,
    /// Short display label (e.g. "A3")
    pub key_prefix: String,
    pub description: Option<String>,
    pub status: KeyStatus,
    pub last_verified: Option<DateTime<Utc>>,
    /// Device that registered the key
    pub device_id: Option<String>,
}

/// Payload for registering a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewKey {
    pub key_number: String,
    pub location_name: String,
    pub key_prefix: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: KeyStatus,
    #[serde(default)]
    pub device_id: Option<String>,
}

impl NewKey {
    pub fn new(
        key_number: impl Into<String>,
        location_name: impl Into<String>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            key_number: key_number.into(),
            location_name: location_name.into(),
            key_prefix: key_prefix.into(),
            description: None,
            status: KeyStatus::Available,
            device_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.require_text("keyNumber", &self.key_number, MAX_KEY_NUMBER_LEN);
        v.require_text("locationName", &self.location_name, MAX_TEXT_LEN);
        v.require_text("keyPrefix", &self.key_prefix, MAX_TEXT_LEN);
        if let Some(ref description) = self.description {
            v.limit_text("description", description, MAX_TEXT_LEN);
        }
        v.finish()
    }

    /// Materialize the stored row once the store has assigned an id
    pub fn into_key(self, id: i64) -> Key {
        Key {
            id,
            key_number: self.key_number.trim().to_string(),
            location_name: self.location_name,
            key_prefix: self.key_prefix,
            description: self.description,
            status: self.status,
            last_verified: None,
            device_id: self.device_id,
        }
    }
}

/// Partial update of a key. Absent fields are left untouched.
///
/// `description` and `deviceId` distinguish "absent" from an explicit `null`,
/// which clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPatch {
    pub key_number: Option<String>,
    pub location_name: Option<String>,
    pub key_prefix: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub status: Option<KeyStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub device_id: Option<Option<String>>,
}

impl KeyPatch {
    pub fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        if let Some(ref key_number) = self.key_number {
            v.require_text("keyNumber", key_number, MAX_KEY_NUMBER_LEN);
        }
        if let Some(ref location_name) = self.location_name {
            v.require_text("locationName", location_name, MAX_TEXT_LEN);
        }
        if let Some(ref key_prefix) = self.key_prefix {
            v.require_text("keyPrefix", key_prefix, MAX_TEXT_LEN);
        }
        v.finish()
    }

    /// Merge the present fields into `key`
    pub fn apply(&self, key: &mut Key) {
        if let Some(ref key_number) = self.key_number {
            key.key_number = key_number.trim().to_string();
        }
        if let Some(ref location_name) = self.location_name {
            key.location_name = location_name.clone();
        }
        if let Some(ref key_prefix) = self.key_prefix {
            key.key_prefix = key_prefix.clone();
        }
        if let Some(ref description) = self.description {
            key.description = description.clone();
        }
        if let Some(status) = self.status {
            key.status = status;
        }
        if let Some(ref device_id) = self.device_id {
            key.device_id = device_id.clone();
        }
    }
}

// =============================================================================
// Verification
// =============================================================================

/// Immutable record that a key was physically checked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub id: i64,
    pub key_id: i64,
    pub verified_at: DateTime<Utc>,
    pub status: KeyStatus,
    pub device_id: Option<String>,
}

/// Payload for recording a verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVerification {
    pub key_id: i64,
    pub status: KeyStatus,
    #[serde(default)]
    pub device_id: Option<String>,
}

impl NewVerification {
    pub fn new(key_id: i64, status: KeyStatus) -> Self {
        Self {
            key_id,
            status,
            device_id: None,
        }
    }

    pub fn from_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }
}

/// Filter for listing verifications
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationFilter {
    pub key_id: Option<i64>,
    pub device_id: Option<String>,
}

impl VerificationFilter {
    pub fn for_key(key_id: i64) -> Self {
        Self {
            key_id: Some(key_id),
            device_id: None,
        }
    }

    pub fn matches(&self, verification: &Verification) -> bool {
        self.key_id.map_or(true, |id| verification.key_id == id)
            && self
                .device_id
                .as_deref()
                .map_or(true, |d| verification.device_id.as_deref() == Some(d))
    }
}

// =============================================================================
// Pending verification
// =============================================================================

/// An open (or since completed) request to check a particular key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingVerification {
    pub id: i64,
    pub key_id: i64,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_completed: bool,
}

impl PendingVerification {
    /// A freshly requested, still open row
    pub fn open(id: i64, key_id: i64, requested_at: DateTime<Utc>) -> Self {
        Self {
            id,
            key_id,
            requested_at,
            completed_at: None,
            is_completed: false,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.is_completed
    }

    /// Close the request. Callers must check `is_open` first; a row is never
    /// completed twice.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.is_completed = true;
        self.completed_at = Some(at);
    }
}

/// Payload for requesting a verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPendingVerification {
    pub key_id: i64,
}

/// Filter for listing pending verifications
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingFilter {
    pub key_id: Option<i64>,
    pub completed: Option<bool>,
}

impl PendingFilter {
    /// Only rows that are still open
    pub fn open() -> Self {
        Self {
            key_id: None,
            completed: Some(false),
        }
    }

    pub fn matches(&self, pending: &PendingVerification) -> bool {
        self.key_id.map_or(true, |id| pending.key_id == id)
            && self.completed.map_or(true, |c| pending.is_completed == c)
    }
}

/// The open pending verification joined with the key it targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePendingVerification {
    #[serde(flatten)]
    pub pending: PendingVerification,
    pub key: Key,
}

// =============================================================================
// Settings
// =============================================================================

/// Per-device verification and alerting preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub id: i64,
    pub device_id: String,
    pub random_verification: bool,
    /// Hours between expected verifications
    pub verification_frequency: i32,
    pub require_photo_evidence: bool,
    pub missing_key_alerts: bool,
    pub daily_summary: bool,
    /// Minutes
    pub alert_response_time: i32,
    pub auto_sync: bool,
    /// Minutes
    pub sync_frequency: i32,
}

impl Setting {
    /// How long a verification stays fresh for keys viewed from this device
    pub fn status_threshold(&self) -> Duration {
        Duration::hours(i64::from(self.verification_frequency.max(1)))
    }
}

/// Values for a new settings row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsTemplate {
    pub random_verification: bool,
    pub verification_frequency: i32,
    pub require_photo_evidence: bool,
    pub missing_key_alerts: bool,
    pub daily_summary: bool,
    pub alert_response_time: i32,
    pub auto_sync: bool,
    pub sync_frequency: i32,
}

impl Default for SettingsTemplate {
    fn default() -> Self {
        Self {
            random_verification: true,
            verification_frequency: 6,
            require_photo_evidence: false,
            missing_key_alerts: true,
            daily_summary: true,
            alert_response_time: 30,
            auto_sync: true,
            sync_frequency: 15,
        }
    }
}

impl SettingsTemplate {
    pub fn into_setting(self, id: i64, device_id: impl Into<String>) -> Setting {
        Setting {
            id,
            device_id: device_id.into(),
            random_verification: self.random_verification,
            verification_frequency: self.verification_frequency,
            require_photo_evidence: self.require_photo_evidence,
            missing_key_alerts: self.missing_key_alerts,
            daily_summary: self.daily_summary,
            alert_response_time: self.alert_response_time,
            auto_sync: self.auto_sync,
            sync_frequency: self.sync_frequency,
        }
    }
}

/// Partial update of a settings row
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub random_verification: Option<bool>,
    pub verification_frequency: Option<i32>,
    pub require_photo_evidence: Option<bool>,
    pub missing_key_alerts: Option<bool>,
    pub daily_summary: Option<bool>,
    pub alert_response_time: Option<i32>,
    pub auto_sync: Option<bool>,
    pub sync_frequency: Option<i32>,
}

impl SettingsPatch {
    pub fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        if let Some(hours) = self.verification_frequency {
            v.require_positive("verificationFrequency", hours);
        }
        if let Some(minutes) = self.alert_response_time {
            v.require_positive("alertResponseTime", minutes);
        }
        if let Some(minutes) = self.sync_frequency {
            v.require_positive("syncFrequency", minutes);
        }
        v.finish()
    }

    pub fn apply(&self, setting: &mut Setting) {
        if let Some(value) = self.random_verification {
            setting.random_verification = value;
        }
        if let Some(value) = self.verification_frequency {
            setting.verification_frequency = value;
        }
        if let Some(value) = self.require_photo_evidence {
            setting.require_photo_evidence = value;
        }
        if let Some(value) = self.missing_key_alerts {
            setting.missing_key_alerts = value;
        }
        if let Some(value) = self.daily_summary {
            setting.daily_summary = value;
        }
        if let Some(value) = self.alert_response_time {
            setting.alert_response_time = value;
        }
        if let Some(value) = self.auto_sync {
            setting.auto_sync = value;
        }
        if let Some(value) = self.sync_frequency {
            setting.sync_frequency = value;
        }
    }
}

/// Deserialize a field that may be absent, `null`, or a value.
/// Absent stays `None` via `#[serde(default)]`; `null` becomes `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
