// crates/import-profile-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Profile Store
// Description: Durable ProfileStore backend using SQLite WAL.
// Purpose: Persist import profiles across restarts.
// Dependencies: import-profile-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`ProfileStore`] implementation that
//! keeps one JSON document per profile alongside case-folded lookup columns.
//! Constraint lookups are approximate in the same way as the in-memory
//! backend, so callers that delete must still filter candidates exactly.
//!
//! [`ProfileStore`]: import_profile_core::ProfileStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_PROFILE_BYTES;
pub use store::SqliteProfileStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
