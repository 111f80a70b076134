// crates/import-profile-server/src/lib.rs
// ============================================================================
// Module: Import Profile Server
// Description: HTTP transport for import profile management.
// Purpose: Expose the action dispatcher behind an abuse gate with audit logs.
// Dependencies: import-profile-core, import-profile-config, axum, tokio
// ============================================================================

//! ## Overview
//! The server crate binds the configured route, extracts request parameters
//! from the query string and form bodies, consults the per-client abuse
//! gate, and hands the request to [`import_profile_core::ActionDispatcher`].
//! Responses are JSON or JSONP. Every request yields one audit event.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod gate;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::ProfileAuditEvent;
pub use audit::ProfileAuditEventParams;
pub use audit::ProfileAuditSink;
pub use audit::RequestOutcome;
pub use audit::StderrAuditSink;
pub use gate::AbuseGate;
pub use server::ImportProfileServer;
pub use server::ServerError;
