// crates/import-profile-core/src/runtime/store.rs
// ============================================================================
// Module: Import Profile In-Memory Store
// Description: In-memory profile store and shared store wrapper.
// Purpose: Provide a deterministic store without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryProfileStore`] keeps profiles in a `BTreeMap` behind a mutex and
//! applies the same approximate term matching as indexed backends, so tests
//! observe realistic over-matching. [`SharedProfileStore`] wraps any backend
//! as a clonable trait object.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::ConstraintSet;
use crate::core::ImportProfileEntry;
use crate::core::ProfileId;
use crate::core::ResultOrder;
use crate::core::SourceType;
use crate::interfaces::ProfileStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory profile store for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProfileStore {
    /// Profiles keyed by id, protected by a mutex.
    profiles: Arc<Mutex<BTreeMap<ProfileId, ImportProfileEntry>>>,
}

impl InMemoryProfileStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `entries`.
    #[must_use]
    pub fn with_entries(entries: impl IntoIterator<Item = ImportProfileEntry>) -> Self {
        let profiles = entries.into_iter().map(|entry| (entry.id.clone(), entry)).collect();
        Self {
            profiles: Arc::new(Mutex::new(profiles)),
        }
    }

    /// Returns the number of stored profiles.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    /// Returns true when the store holds no profiles.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }

    /// Locks the profile map.
    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<ProfileId, ImportProfileEntry>>, StoreError>
    {
        self.profiles
            .lock()
            .map_err(|_| StoreError::Store("profile store mutex poisoned".to_string()))
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn find_by_id(&self, id: &ProfileId) -> Result<Option<ImportProfileEntry>, StoreError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn find_by_constraints(
        &self,
        constraints: &ConstraintSet,
        order: ResultOrder,
    ) -> Result<Vec<ImportProfileEntry>, StoreError> {
        let mut matches: Vec<ImportProfileEntry> = self
            .lock()?
            .values()
            .filter(|entry| constraints.approximately_matches(entry))
            .cloned()
            .collect();
        if order == ResultOrder::LatestFirst {
            matches.sort_by(|a, b| {
                b.last_modified.cmp(&a.last_modified).then_with(|| a.id.cmp(&b.id))
            });
        }
        Ok(matches)
    }

    fn upsert(&self, entry: &ImportProfileEntry) -> Result<bool, StoreError> {
        self.lock()?.insert(entry.id.clone(), entry.clone());
        Ok(true)
    }

    fn delete_by_id(&self, id: &ProfileId, source_type: SourceType) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        let stored_under_type = guard.get(id).is_some_and(|entry| entry.source_type == source_type);
        let removed = stored_under_type && guard.remove(id).is_some();
        drop(guard);
        Ok(removed)
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared profile store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedProfileStore {
    /// Inner store implementation.
    inner: Arc<dyn ProfileStore + Send + Sync>,
}

impl SharedProfileStore {
    /// Wraps a profile store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl ProfileStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn ProfileStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl ProfileStore for SharedProfileStore {
    fn find_by_id(&self, id: &ProfileId) -> Result<Option<ImportProfileEntry>, StoreError> {
        self.inner.find_by_id(id)
    }

    fn find_by_constraints(
        &self,
        constraints: &ConstraintSet,
        order: ResultOrder,
    ) -> Result<Vec<ImportProfileEntry>, StoreError> {
        self.inner.find_by_constraints(constraints, order)
    }

    fn upsert(&self, entry: &ImportProfileEntry) -> Result<bool, StoreError> {
        self.inner.upsert(entry)
    }

    fn delete_by_id(&self, id: &ProfileId, source_type: SourceType) -> Result<bool, StoreError> {
        self.inner.delete_by_id(id, source_type)
    }
}
