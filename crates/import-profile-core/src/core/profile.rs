// crates/import-profile-core/src/core/profile.rs
// ============================================================================
// Module: Import Profile Entry
// Description: The managed import profile record and its typed fields.
// Purpose: Provide the canonical, serializable profile representation.
// Dependencies: serde, serde_json, url
// ============================================================================

//! ## Overview
//! An [`ImportProfileEntry`] describes one external content source to be
//! harvested periodically. Entries are built by
//! [`crate::core::validation::ProfileValidator`] from untyped payloads and
//! serialize with snake_case keys; unrecognized payload keys are carried
//! verbatim in [`ImportProfileEntry::extra`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::de::Error as _;
use serde_json::Value;
use url::Url;

use crate::core::identifiers::ProfileId;
use crate::core::source_type::SourceType;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Source URL
// ============================================================================

/// Well-formed source URL, kept exactly as submitted.
///
/// # Invariants
/// - The text parses as an absolute URL with a host.
/// - The text is never normalized; deletion compares it by string equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SourceUrl(String);

impl SourceUrl {
    /// Validates and wraps a source URL.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message when the URL is malformed.
    pub fn parse(value: &str) -> Result<Self, String> {
        let parsed = Url::parse(value).map_err(|err| format!("malformed source_url: {err}"))?;
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err("malformed source_url: missing host".to_string());
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the URL exactly as submitted.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SourceUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(D::Error::custom)
    }
}

// ============================================================================
// SECTION: Privacy Status
// ============================================================================

/// Visibility of a profile to other clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyStatus {
    /// Visible to every client.
    Public,
    /// Visible only to the owning identity.
    Private,
}

impl PrivacyStatus {
    /// Parses the wire label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Import Profile Entry
// ============================================================================

/// Import profile record.
///
/// # Invariants
/// - `id` is unique across the store and immutable after creation.
/// - `last_modified` is set by the service, never by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportProfileEntry {
    /// Unique profile identifier.
    #[serde(rename = "id_str")]
    pub id: ProfileId,
    /// Origin being imported.
    pub source_url: SourceUrl,
    /// Harvester that consumes the profile.
    pub source_type: SourceType,
    /// Authoring account at the source, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_name: Option<String>,
    /// Requesting client host, used when no screen name applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_host: Option<String>,
    /// Harvest interval in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harvesting_freq: Option<u64>,
    /// Profile lifetime in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<u64>,
    /// Visibility of the profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_status: Option<PrivacyStatus>,
    /// Creation time reported by the ingestion path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    /// Last successful update.
    pub last_modified: Timestamp,
    /// Profile-specific fields carried verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ImportProfileEntry {
    /// Returns the entry as a JSON object value.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when a field cannot be serialized.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
