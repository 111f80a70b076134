// crates/import-profile-core/src/runtime/mod.rs
// ============================================================================
// Module: Import Profile Runtime
// Description: Action handlers, dispatcher, and in-memory store.
// Purpose: Execute search, update, and delete requests against a store.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime hosts the three action handlers and the dispatcher that
//! selects between them. Handlers are synchronous and borrow the store for
//! the duration of one request.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod delete;
pub mod dispatcher;
pub mod error;
pub mod search;
pub mod store;
pub mod update;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use delete::DeleteCriteria;
pub use delete::DeleteHandler;
pub use delete::DeleteRequest;
pub use dispatcher::Action;
pub use dispatcher::ActionDispatcher;
pub use dispatcher::ActionResponse;
pub use dispatcher::DispatchError;
pub use dispatcher::GateVerdict;
pub use dispatcher::ProfileRequest;
pub use error::ProfileError;
pub use search::SearchHandler;
pub use search::SearchMetadata;
pub use search::SearchRequest;
pub use search::SearchResult;
pub use store::InMemoryProfileStore;
pub use store::SharedProfileStore;
pub use update::MutationReport;
pub use update::UpdateHandler;
pub use update::UpdateRequest;
