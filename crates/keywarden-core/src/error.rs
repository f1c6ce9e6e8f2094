//! Error types for the Keywarden domain

use serde::Serialize;
use thiserror::Error;

/// Result type alias using KeywardenError
pub type Result<T> = std::result::Result<T, KeywardenError>;

/// A single rejected field in a request payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending field (camelCase, as it appears on the wire)
    pub field: String,
    /// Human-readable reason
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by domain validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeywardenError {
    /// One or more payload fields failed validation
    #[error("Validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// A status string that is not one of the known key states
    #[error("Invalid key status: {0}")]
    InvalidStatus(String),
}

impl KeywardenError {
    /// Field-level details, if this is a validation failure
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            KeywardenError::Validation(errors) => errors.clone(),
            KeywardenError::InvalidStatus(value) => vec![FieldError::new(
                "status",
                format!("'{}' is not one of available, verified, missing", value),
            )],
        }
    }
}

/// Collects field errors and turns them into a single result
#[derive(Debug, Default)]
pub(crate) struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn require_text(&mut self, field: &str, value: &str, max_len: usize) {
        if value.trim().is_empty() {
            self.errors.push(FieldError::new(field, "must not be empty"));
        } else {
            self.limit_text(field, value, max_len);
        }
    }

    pub(crate) fn limit_text(&mut self, field: &str, value: &str, max_len: usize) {
        if value.chars().count() > max_len {
            self.errors.push(FieldError::new(
                field,
                format!("must be at most {} characters", max_len),
            ));
        }
    }

    pub(crate) fn require_positive(&mut self, field: &str, value: i32) {
        if value <= 0 {
            self.errors
                .push(FieldError::new(field, "must be greater than zero"));
        }
    }

    pub(crate) fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(KeywardenError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validator_collects_every_failure() {
        let mut v = Validator::new();
        v.require_text("keyNumber", "  ", 32);
        v.require_text("locationName", "Front desk", 128);
        v.require_positive("syncFrequency", 0);

        let err = v.finish().unwrap_err();
        let fields: Vec<_> = err.field_errors().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["keyNumber", "syncFrequency"]);
    }

    #[test]
    fn test_invalid_status_maps_to_status_field() {
        let err = KeywardenError::InvalidStatus("lost".into());
        assert_eq!(err.field_errors()[0].field, "status");
    }
}
