// crates/import-profile-server/src/audit.rs
// ============================================================================
// Module: Request Audit Logging
// Description: Structured audit events for import profile requests.
// Purpose: Emit one JSON line per request without a logging framework.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events describe who asked for what and how it ended: peer address,
//! action label, outcome, HTTP status, records touched, and an error kind.
//! Request payloads are never recorded. Sinks write JSON lines to stderr or
//! an append-only file, or drop events entirely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// The action completed.
    Ok,
    /// The request was rejected or the action failed.
    Error,
    /// The abuse gate refused the caller.
    Blocked,
}

/// Import profile request audit payload.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Classified action label.
    pub action: &'static str,
    /// Request outcome.
    pub outcome: RequestOutcome,
    /// HTTP status returned to the caller.
    pub status: u16,
    /// Records reported by a successful action.
    pub records: Option<usize>,
    /// Error kind label when the request failed.
    pub error_kind: Option<&'static str>,
}

/// Inputs for [`ProfileAuditEvent::new`].
#[derive(Debug, Clone)]
pub struct ProfileAuditEventParams {
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Classified action label.
    pub action: &'static str,
    /// Request outcome.
    pub outcome: RequestOutcome,
    /// HTTP status returned to the caller.
    pub status: u16,
    /// Records reported by a successful action.
    pub records: Option<usize>,
    /// Error kind label when the request failed.
    pub error_kind: Option<&'static str>,
}

impl ProfileAuditEvent {
    /// Creates a new request audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: ProfileAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "import_profile_request",
            timestamp_ms,
            peer_ip: params.peer_ip,
            action: params.action,
            outcome: params.outcome,
            status: params.status,
            records: params.records,
            error_kind: params.error_kind,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for import profile request events.
pub trait ProfileAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &ProfileAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ProfileAuditSink for StderrAuditSink {
    fn record(&self, event: &ProfileAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ProfileAuditSink for FileAuditSink {
    fn record(&self, event: &ProfileAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl ProfileAuditSink for NoopAuditSink {
    fn record(&self, _event: &ProfileAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use serde_json::Value;

    use super::FileAuditSink;
    use super::ProfileAuditEvent;
    use super::ProfileAuditEventParams;
    use super::ProfileAuditSink;
    use super::RequestOutcome;

    fn blocked_event() -> ProfileAuditEvent {
        ProfileAuditEvent::new(ProfileAuditEventParams {
            peer_ip: Some("10.0.0.7".to_string()),
            action: "delete",
            outcome: RequestOutcome::Blocked,
            status: 503,
            records: None,
            error_kind: Some("gate_blocked"),
        })
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = FileAuditSink::new(&path).unwrap();
        sink.record(&blocked_event());
        sink.record(&blocked_event());
        drop(sink);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "import_profile_request");
        assert_eq!(first["outcome"], "blocked");
        assert_eq!(first["status"], 503);
        assert_eq!(first["error_kind"], "gate_blocked");
        assert!(first["records"].is_null());
    }
}
