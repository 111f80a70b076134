// crates/import-profile-server/src/server/tests.rs
// ============================================================================
// Module: Import Profile Server Unit Tests
// Description: Unit tests for parameter extraction, encoding, and gating.
// Purpose: Validate request handling without binding a socket.
// Dependencies: import-profile-server
// ============================================================================

//! ## Overview
//! Drives the request pipeline with in-memory stores and a recording audit
//! sink. Covers JSON and JSONP encoding, callback validation, body limits,
//! form merging, and abuse gate refusals.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only request assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::Mutex;

use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use import_profile_config::AbuseGateConfig;
use import_profile_config::ProfileStoreConfig;
use import_profile_config::ProfileStoreType;
use import_profile_core::ActionDispatcher;
use import_profile_core::ImportProfileEntry;
use import_profile_core::InMemoryProfileStore;
use import_profile_core::ProfileId;
use import_profile_core::ProfileStore;
use import_profile_core::SharedProfileStore;
use import_profile_core::SourceType;
use import_profile_core::SourceUrl;
use import_profile_core::SystemClock;
use import_profile_core::Timestamp;
use serde_json::Value;

use super::HttpReply;
use super::ServerState;
use super::build_profile_store;
use super::handle_request;
use super::is_valid_callback;
use crate::audit::ProfileAuditEvent;
use crate::audit::ProfileAuditSink;
use crate::audit::RequestOutcome;
use crate::gate::AbuseGate;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Audit sink that keeps every event.
#[derive(Default)]
struct RecordingAuditSink {
    events: Mutex<Vec<ProfileAuditEvent>>,
}

impl ProfileAuditSink for RecordingAuditSink {
    fn record(&self, event: &ProfileAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

struct Harness {
    state: ServerState,
    store: InMemoryProfileStore,
    audit: Arc<RecordingAuditSink>,
}

impl Harness {
    fn new(entries: Vec<ImportProfileEntry>, gate: Option<AbuseGateConfig>) -> Self {
        let store = InMemoryProfileStore::with_entries(entries);
        let audit = Arc::new(RecordingAuditSink::default());
        let state = ServerState {
            dispatcher: ActionDispatcher::new(
                SharedProfileStore::from_store(store.clone()),
                Arc::new(SystemClock),
            ),
            gate: gate.map(AbuseGate::new),
            audit: Arc::clone(&audit) as Arc<dyn ProfileAuditSink>,
            max_body_bytes: 1024,
        };
        Self {
            state,
            store,
            audit,
        }
    }

    fn get(&self, query: &str) -> HttpReply {
        handle_request(&self.state, peer(), Some(query), &HeaderMap::new(), &Bytes::new())
    }

    fn post_form(&self, query: Option<&str>, body: &str) -> HttpReply {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
        );
        handle_request(&self.state, peer(), query, &headers, &Bytes::from(body.to_string()))
    }

    fn last_event(&self) -> ProfileAuditEvent {
        self.audit.events.lock().unwrap().last().cloned().unwrap()
    }
}

fn peer() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10))
}

fn entry(id: &str, screen_name: &str, last_modified: i64) -> ImportProfileEntry {
    ImportProfileEntry {
        id: ProfileId::new(id),
        source_url: SourceUrl::parse("https://example.org/feed").unwrap(),
        source_type: SourceType::Twitter,
        screen_name: Some(screen_name.to_string()),
        client_host: None,
        harvesting_freq: Some(15),
        lifetime: None,
        privacy_status: None,
        created_at: None,
        last_modified: Timestamp::from_unix_millis(last_modified),
        extra: BTreeMap::new(),
    }
}

fn json_body(reply: &HttpReply) -> Value {
    serde_json::from_str(&reply.body).unwrap()
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

#[test]
fn search_is_pretty_by_default_and_reports_peer() {
    let harness = Harness::new(vec![entry("a", "alice", 1)], None);
    let reply = harness.get("");
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.content_type, "application/json; charset=utf-8");
    assert!(reply.body.contains('\n'));
    let body = json_body(&reply);
    assert_eq!(body["search_metadata"]["client"], "192.0.2.10");
    assert_eq!(body["search_metadata"]["count"], 1);
    let event = harness.last_event();
    assert_eq!(event.action, "search");
    assert_eq!(event.outcome, RequestOutcome::Ok);
    assert_eq!(event.records, Some(1));
}

#[test]
fn minified_search_is_compact() {
    let harness = Harness::new(vec![entry("a", "alice", 1)], None);
    let reply = harness.get("minified=true");
    assert!(!reply.body.contains('\n'));
    assert_eq!(json_body(&reply)["profiles"][0]["id_str"], "a");
}

#[test]
fn callback_wraps_success_as_jsonp() {
    let harness = Harness::new(vec![], None);
    let reply = harness.get("callback=jQuery.cb_1&minified=true");
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.content_type, "application/javascript; charset=utf-8");
    assert!(reply.body.starts_with("jQuery.cb_1({"));
    assert!(reply.body.ends_with(");\n"));
}

#[test]
fn errors_are_never_wrapped_in_jsonp() {
    let harness = Harness::new(vec![], None);
    let reply = harness.get("action=purge&callback=cb");
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.content_type, "application/json; charset=utf-8");
    let body = json_body(&reply);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "invalid 'action' value : purge");
    let event = harness.last_event();
    assert_eq!(event.action, "invalid");
    assert_eq!(event.outcome, RequestOutcome::Error);
}

#[test]
fn unsafe_callback_is_rejected() {
    let harness = Harness::new(vec![entry("a", "alice", 1)], None);
    let reply = harness.get("callback=alert(1)//");
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&reply)["message"], "invalid 'callback' value");
}

#[test]
fn callback_names_follow_identifier_rules() {
    assert!(is_valid_callback("cb"));
    assert!(is_valid_callback("$.handlers.done_2"));
    assert!(is_valid_callback("_x"));
    assert!(!is_valid_callback("1cb"));
    assert!(!is_valid_callback("a b"));
    assert!(!is_valid_callback("cb;alert"));
    assert!(!is_valid_callback(""));
    assert!(!is_valid_callback(&"a".repeat(129)));
    assert!(is_valid_callback(&"a".repeat(128)));
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

#[test]
fn oversized_body_is_rejected() {
    let harness = Harness::new(vec![entry("a", "alice", 1)], None);
    let body = format!("data={}", "x".repeat(2048));
    let reply = harness.post_form(None, &body);
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
    let event = harness.last_event();
    assert_eq!(event.action, "unknown");
    assert_eq!(event.error_kind, Some("payload_too_large"));
}

#[test]
fn form_body_overrides_query_parameters() {
    let harness = Harness::new(vec![entry("a", "alice", 1), entry("b", "bob", 2)], None);
    let reply = harness.post_form(
        Some("action=update"),
        "action=delete&source_url=https%3A%2F%2Fexample.org%2Ffeed&screen_name=alice",
    );
    assert_eq!(reply.status, StatusCode::OK);
    let body = json_body(&reply);
    assert_eq!(body["message"], "deleted");
    assert_eq!(body["records"], 1);
    assert!(harness.store.find_by_id(&ProfileId::new("a")).unwrap().is_none());
    assert!(harness.store.find_by_id(&ProfileId::new("b")).unwrap().is_some());
    assert_eq!(harness.last_event().action, "delete");
}

#[test]
fn non_form_bodies_are_ignored() {
    let harness = Harness::new(vec![entry("a", "alice", 1)], None);
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let reply = handle_request(
        &harness.state,
        peer(),
        None,
        &headers,
        &Bytes::from_static(b"action=delete"),
    );
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(json_body(&reply)["search_metadata"]["count"], 1);
}

#[test]
fn update_response_is_pretty_even_when_minified() {
    let harness = Harness::new(vec![entry("a", "alice", 1)], None);
    let data = r#"{"id_str":"a","source_url":"https://example.org/other",
        "source_type":"TWITTER","screen_name":"alice"}"#;
    let body = format!("action=update&minified=true&data={}", encode(data));
    let reply = harness.post_form(None, &body);
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert!(reply.body.contains('\n'));
    assert_eq!(json_body(&reply)["message"], "updated");
    let stored = harness.store.find_by_id(&ProfileId::new("a")).unwrap().unwrap();
    assert_eq!(stored.source_url.as_str(), "https://example.org/other");
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

// ============================================================================
// SECTION: Abuse Gate
// ============================================================================

#[test]
fn gate_blocks_with_503_after_threshold() {
    let gate = AbuseGateConfig {
        max_requests: 2,
        window_ms: 60_000,
        blackout_ms: 60_000,
        max_entries: 16,
    };
    let harness = Harness::new(vec![entry("a", "alice", 1)], Some(gate));
    assert_eq!(harness.get("").status, StatusCode::OK);
    assert_eq!(harness.get("").status, StatusCode::OK);
    let reply = harness.get(
        "action=delete&source_url=https%3A%2F%2Fexample.org%2Ffeed&screen_name=alice&callback=cb",
    );
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(&reply)["message"], "your request frequency is too high");
    assert!(harness.store.find_by_id(&ProfileId::new("a")).unwrap().is_some());
    let event = harness.last_event();
    assert_eq!(event.outcome, RequestOutcome::Blocked);
    assert_eq!(event.status, 503);
    assert_eq!(event.error_kind, Some("gate_blocked"));
}

#[test]
fn blocked_caller_gets_503_before_callback_validation() {
    let gate = AbuseGateConfig {
        max_requests: 1,
        window_ms: 60_000,
        blackout_ms: 60_000,
        max_entries: 16,
    };
    let harness = Harness::new(vec![], Some(gate));
    assert_eq!(harness.get("").status, StatusCode::OK);
    assert_eq!(harness.get("").status, StatusCode::SERVICE_UNAVAILABLE);
    let reply = harness.get("callback=alert(1)");
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(&reply)["message"], "your request frequency is too high");
    assert_eq!(harness.last_event().outcome, RequestOutcome::Blocked);
}

#[test]
fn rejected_callbacks_count_against_the_gate() {
    let gate = AbuseGateConfig {
        max_requests: 2,
        window_ms: 60_000,
        blackout_ms: 60_000,
        max_entries: 16,
    };
    let harness = Harness::new(vec![], Some(gate));
    assert_eq!(harness.get("callback=1bad").status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.get("callback=1bad").status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.get("").status, StatusCode::SERVICE_UNAVAILABLE);
}

// ============================================================================
// SECTION: Store Construction
// ============================================================================

#[test]
fn sqlite_store_is_built_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = ProfileStoreConfig {
        store_type: ProfileStoreType::Sqlite,
        path: Some(dir.path().join("profiles.sqlite")),
        ..ProfileStoreConfig::default()
    };
    let store = build_profile_store(&config).unwrap();
    assert!(store.upsert(&entry("a", "alice", 1)).unwrap());
    assert!(dir.path().join("profiles.sqlite").exists());
}

#[test]
fn sqlite_store_without_path_is_config_error() {
    let config = ProfileStoreConfig {
        store_type: ProfileStoreType::Sqlite,
        ..ProfileStoreConfig::default()
    };
    assert!(matches!(build_profile_store(&config), Err(super::ServerError::Config(_))));
}
