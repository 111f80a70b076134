// crates/import-profile-core/src/core/validation.rs
// ============================================================================
// Module: Profile Validator
// Description: Builds typed import profiles from untyped key/value payloads.
// Purpose: Enforce required-field and format rules at the input boundary.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`ProfileValidator`] turns a loosely typed JSON object into a
//! [`ValidatedProfile`] or a [`ValidationError`] carrying a human-readable
//! message. It never panics and never assigns `last_modified`; the caller
//! stamps the validated profile via [`ValidatedProfile::into_entry`].
//!
//! ## Invariants
//! - `id_str` (alias `id`), `source_url`, and `source_type` are required.
//! - `source_type` must be a registry member; account-bound types require a
//!   screen name.
//! - A client-supplied `last_modified` is discarded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::ProfileId;
use crate::core::profile::ImportProfileEntry;
use crate::core::profile::PrivacyStatus;
use crate::core::profile::SourceUrl;
use crate::core::source_type::SourceType;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Field Keys
// ============================================================================

/// Canonical id key.
pub const ID_KEY: &str = "id_str";
/// Accepted alias for the id key.
pub const ID_ALIAS_KEY: &str = "id";
/// Source URL key.
const SOURCE_URL_KEY: &str = "source_url";
/// Source type key.
const SOURCE_TYPE_KEY: &str = "source_type";
/// Screen name key.
const SCREEN_NAME_KEY: &str = "screen_name";
/// Client host key.
const CLIENT_HOST_KEY: &str = "client_host";
/// Harvest interval key.
const HARVESTING_FREQ_KEY: &str = "harvesting_freq";
/// Lifetime key.
const LIFETIME_KEY: &str = "lifetime";
/// Privacy status key.
const PRIVACY_STATUS_KEY: &str = "privacy_status";
/// Creation time key.
const CREATED_AT_KEY: &str = "created_at";
/// Modification time key (system-owned).
const LAST_MODIFIED_KEY: &str = "last_modified";

/// Keys consumed by typed fields; everything else lands in the open bag.
const RESERVED_KEYS: [&str; 11] = [
    ID_KEY,
    ID_ALIAS_KEY,
    SOURCE_URL_KEY,
    SOURCE_TYPE_KEY,
    SCREEN_NAME_KEY,
    CLIENT_HOST_KEY,
    HARVESTING_FREQ_KEY,
    LIFETIME_KEY,
    PRIVACY_STATUS_KEY,
    CREATED_AT_KEY,
    LAST_MODIFIED_KEY,
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Payload failed a profile field rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    /// Creates a validation error with a human-readable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// SECTION: Validated Profile
// ============================================================================

/// Profile that passed every field rule but has not been stamped yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedProfile {
    /// Entry fields, stamped with a placeholder modification time.
    entry: ImportProfileEntry,
}

impl ValidatedProfile {
    /// Returns the validated profile identifier.
    #[must_use]
    pub const fn id(&self) -> &ProfileId {
        &self.entry.id
    }

    /// Finishes the entry with the modification time chosen by the caller.
    #[must_use]
    pub fn into_entry(self, last_modified: Timestamp) -> ImportProfileEntry {
        ImportProfileEntry {
            last_modified,
            ..self.entry
        }
    }
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Builds and validates import profiles from untyped payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileValidator;

impl ProfileValidator {
    /// Extracts the lookup id from a payload.
    ///
    /// Returns `None` when neither `id_str` nor `id` holds a non-empty string.
    #[must_use]
    pub fn profile_id(map: &Map<String, Value>) -> Option<ProfileId> {
        [ID_KEY, ID_ALIAS_KEY]
            .into_iter()
            .filter_map(|key| map.get(key).and_then(Value::as_str))
            .find(|value| !value.is_empty())
            .map(ProfileId::from)
    }

    /// Builds a validated profile from a payload.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when any field rule is violated.
    pub fn build(map: &Map<String, Value>) -> Result<ValidatedProfile, ValidationError> {
        let id = Self::profile_id(map)
            .ok_or_else(|| ValidationError::new(format!("{ID_KEY} is required")))?;
        let source_url = required_string(map, SOURCE_URL_KEY)?;
        let source_url = SourceUrl::parse(&source_url).map_err(ValidationError::new)?;
        let source_type_label = required_string(map, SOURCE_TYPE_KEY)?;
        let source_type = SourceType::parse(&source_type_label).ok_or_else(|| {
            ValidationError::new(format!("unknown source_type: {source_type_label}"))
        })?;
        let screen_name = optional_string(map, SCREEN_NAME_KEY)?;
        if source_type.requires_screen_name() && screen_name.is_none() {
            return Err(ValidationError::new(format!(
                "source_type {source_type} requires a screen_name"
            )));
        }
        let client_host = optional_string(map, CLIENT_HOST_KEY)?;
        let harvesting_freq = optional_uint(map, HARVESTING_FREQ_KEY)?;
        if harvesting_freq == Some(0) {
            return Err(ValidationError::new("harvesting_freq must be greater than zero"));
        }
        let lifetime = optional_uint(map, LIFETIME_KEY)?;
        let privacy_status = optional_string(map, PRIVACY_STATUS_KEY)?
            .map(|label| {
                PrivacyStatus::parse(&label).ok_or_else(|| {
                    ValidationError::new(format!("unknown privacy_status: {label}"))
                })
            })
            .transpose()?;
        let created_at = optional_string(map, CREATED_AT_KEY)?
            .map(|text| {
                Timestamp::parse_rfc3339(&text)
                    .map_err(|err| ValidationError::new(format!("{CREATED_AT_KEY}: {err}")))
            })
            .transpose()?;
        let extra: BTreeMap<String, Value> = map
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(ValidatedProfile {
            entry: ImportProfileEntry {
                id,
                source_url,
                source_type,
                screen_name,
                client_host,
                harvesting_freq,
                lifetime,
                privacy_status,
                created_at,
                last_modified: Timestamp::from_unix_millis(0),
                extra,
            },
        })
    }
}

// ============================================================================
// SECTION: Field Helpers
// ============================================================================

/// Reads a required, non-empty string field.
fn required_string(map: &Map<String, Value>, key: &str) -> Result<String, ValidationError> {
    optional_string(map, key)?.ok_or_else(|| ValidationError::new(format!("{key} is required")))
}

/// Reads an optional string field; null and empty strings mean absent.
fn optional_string(map: &Map<String, Value>, key: &str) -> Result<Option<String>, ValidationError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) if value.is_empty() => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(ValidationError::new(format!("{key} must be a string"))),
    }
}

/// Reads an optional unsigned integer field, accepting numeric strings.
fn optional_uint(map: &Map<String, Value>, key: &str) -> Result<Option<u64>, ValidationError> {
    let invalid = || ValidationError::new(format!("{key} must be a non-negative integer"));
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number.as_u64().map(Some).ok_or_else(invalid),
        Some(Value::String(text)) => text.trim().parse::<u64>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
