// crates/import-profile-core/src/interfaces/mod.rs
// ============================================================================
// Module: Import Profile Interfaces
// Description: Backend-agnostic interfaces for profile storage and time.
// Purpose: Define the contract surfaces consumed by the action handlers.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the handlers reach external systems without
//! embedding backend details. The store owns durability and atomicity of
//! single-document writes; this crate performs no locking of its own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use thiserror::Error;

use crate::core::ConstraintSet;
use crate::core::ImportProfileEntry;
use crate::core::ProfileId;
use crate::core::ResultOrder;
use crate::core::SourceType;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Profile Store
// ============================================================================

/// Profile store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("profile store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("profile store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("profile store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("profile store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("profile store error: {0}")]
    Store(String),
}

/// Document store keyed by profile id.
pub trait ProfileStore {
    /// Loads a profile by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_by_id(&self, id: &ProfileId) -> Result<Option<ImportProfileEntry>, StoreError>;

    /// Returns every profile approximately matching the constraints.
    ///
    /// Matching is term based and may return entries that do not equal the
    /// constraint values exactly.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_by_constraints(
        &self,
        constraints: &ConstraintSet,
        order: ResultOrder,
    ) -> Result<Vec<ImportProfileEntry>, StoreError>;

    /// Writes a profile, overwriting any entry with the same id.
    ///
    /// Returns false when the store declined the write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn upsert(&self, entry: &ImportProfileEntry) -> Result<bool, StoreError>;

    /// Deletes the profile with `id` stored under `source_type`.
    ///
    /// Returns true only when an entry was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    fn delete_by_id(&self, id: &ProfileId, source_type: SourceType) -> Result<bool, StoreError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Time source for modification stamps.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Timestamp::from_unix_millis(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
    }
}
