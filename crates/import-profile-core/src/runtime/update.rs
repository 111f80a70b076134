// crates/import-profile-core/src/runtime/update.rs
// ============================================================================
// Module: Update Handler
// Description: Replaces an existing import profile from a JSON payload.
// Purpose: Validate, stamp, and persist profile updates.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! Update only replaces profiles that already exist; creation happens on the
//! ingestion path. The handler validates the payload, stamps a strictly
//! increasing `last_modified`, and writes the whole entry back.
//!
//! ## Invariants
//! - The stored `last_modified` after a successful update is strictly greater
//!   than the prior value.
//! - Nothing is written when any check fails.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::core::ProfileId;
use crate::core::ProfileValidator;
use crate::interfaces::Clock;
use crate::interfaces::ProfileStore;
use crate::runtime::error::ProfileError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Update request inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Raw JSON object text of the replacement profile.
    pub data: Option<String>,
}

/// Status body returned by mutating actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationReport {
    /// Always `ok` for a completed mutation.
    pub status: &'static str,
    /// Number of records written or removed.
    pub records: usize,
    /// Past-tense verb naming the mutation.
    pub message: &'static str,
}

impl MutationReport {
    /// Builds a report for an update.
    #[must_use]
    pub const fn updated(records: usize) -> Self {
        Self {
            status: "ok",
            records,
            message: "updated",
        }
    }

    /// Builds a report for a delete.
    #[must_use]
    pub const fn deleted(records: usize) -> Self {
        Self {
            status: "ok",
            records,
            message: "deleted",
        }
    }
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Update action handler.
pub struct UpdateHandler<'a, S: ProfileStore + ?Sized, C: Clock + ?Sized> {
    /// Backing store.
    store: &'a S,
    /// Time source for modification stamps.
    clock: &'a C,
}

impl<'a, S: ProfileStore + ?Sized, C: Clock + ?Sized> UpdateHandler<'a, S, C> {
    /// Creates a handler over `store` stamping times from `clock`.
    pub const fn new(store: &'a S, clock: &'a C) -> Self {
        Self {
            store,
            clock,
        }
    }

    /// Applies an update.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::MissingData`] for an empty payload,
    /// [`ProfileError::RequestFormat`] for unparseable or id-less payloads,
    /// [`ProfileError::NotFound`] for an unknown id,
    /// [`ProfileError::Validation`] when a field rule fails, and
    /// [`ProfileError::Store`] when the store fails.
    pub fn handle(&self, request: &UpdateRequest) -> Result<MutationReport, ProfileError> {
        let data = request.data.as_deref().map(str::trim).unwrap_or_default();
        if data.is_empty() {
            return Err(ProfileError::MissingData(
                "your request must contain a data object.".to_string(),
            ));
        }
        let payload: Value = serde_json::from_str(data).map_err(|err| invalid_data(&err))?;
        let Value::Object(map) = payload else {
            return Err(invalid_data(&"data must be a JSON object"));
        };
        let id = ProfileValidator::profile_id(&map)
            .ok_or_else(|| invalid_data(&"id_str field missing"))?;
        let Some(prior) = self.store.find_by_id(&id)? else {
            return Err(not_found(&id));
        };
        let validated = ProfileValidator::build(&map)?;
        let stamp = self.clock.now().max(prior.last_modified.next_millisecond());
        let entry = validated.into_entry(stamp);
        let written = self.store.upsert(&entry)?;
        Ok(MutationReport::updated(usize::from(written)))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Wraps a payload problem in the request-format error.
fn invalid_data(detail: &dyn std::fmt::Display) -> ProfileError {
    ProfileError::RequestFormat(format!("submitted data is invalid : {detail}"))
}

/// Builds the not-found error for `id`.
fn not_found(id: &ProfileId) -> ProfileError {
    ProfileError::NotFound(format!(
        "submitted data is invalid : import profile id_str field '{id}' not found"
    ))
}
