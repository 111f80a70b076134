// crates/import-profile-core/src/core/mod.rs
// ============================================================================
// Module: Import Profile Core Types
// Description: Canonical import profile records and their validation rules.
// Purpose: Provide stable, serializable types shared by every surface.
// Dependencies: serde, serde_json, time, url
// ============================================================================

//! ## Overview
//! Core types define import profile records, the closed source type
//! registry, constraint queries, and the validator that builds records from
//! untyped payloads. These types are the canonical source of truth for the
//! HTTP surface and the store backends.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod profile;
pub mod query;
pub mod source_type;
pub mod time;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::ProfileId;
pub use profile::ImportProfileEntry;
pub use profile::PrivacyStatus;
pub use profile::SourceUrl;
pub use query::ConstraintField;
pub use query::ConstraintSet;
pub use query::ResultOrder;
pub use source_type::SourceType;
pub use time::Timestamp;
pub use time::TimestampError;
pub use validation::ProfileValidator;
pub use validation::ValidatedProfile;
pub use validation::ValidationError;
