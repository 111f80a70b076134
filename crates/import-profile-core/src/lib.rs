// crates/import-profile-core/src/lib.rs
// ============================================================================
// Module: Import Profile Core Library
// Description: Public API surface for import profile management.
// Purpose: Expose core types, interfaces, and runtime handlers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Import profile core manages the registry of external sources that a
//! harvester imports periodically. It validates profile payloads, routes
//! search, update, and delete actions, and narrows approximate store
//! matches to exact ones before anything is removed. Storage is reached
//! through the [`ProfileStore`] interface only.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::Clock;
pub use interfaces::ProfileStore;
pub use interfaces::StoreError;
pub use interfaces::SystemClock;
pub use runtime::Action;
pub use runtime::ActionDispatcher;
pub use runtime::ActionResponse;
pub use runtime::DeleteCriteria;
pub use runtime::DeleteHandler;
pub use runtime::DeleteRequest;
pub use runtime::DispatchError;
pub use runtime::GateVerdict;
pub use runtime::InMemoryProfileStore;
pub use runtime::MutationReport;
pub use runtime::ProfileError;
pub use runtime::ProfileRequest;
pub use runtime::SearchHandler;
pub use runtime::SearchMetadata;
pub use runtime::SearchRequest;
pub use runtime::SearchResult;
pub use runtime::SharedProfileStore;
pub use runtime::UpdateHandler;
pub use runtime::UpdateRequest;
