// crates/import-profile-config/src/lib.rs
// ============================================================================
// Module: Import Profile Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for import-profile.toml semantics.
// Dependencies: import-profile-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `import-profile-config` defines the configuration model for the import
//! profile service. Loading is strict and fail-closed: oversized, non-UTF-8,
//! or out-of-range configuration is rejected before any listener opens.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
