// crates/import-profile-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validate SQLite ProfileStore behavior.
// Purpose: Ensure durable persistence, approximate lookup, and integrity checks.
// Dependencies: import-profile-store-sqlite, import-profile-core, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed profile store. Exercises reopen
//! durability, term-based lookup, typed deletion, and failure on tampered
//! rows.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use import_profile_core::ConstraintField;
use import_profile_core::ConstraintSet;
use import_profile_core::DeleteHandler;
use import_profile_core::DeleteRequest;
use import_profile_core::ImportProfileEntry;
use import_profile_core::ProfileId;
use import_profile_core::ProfileStore;
use import_profile_core::ResultOrder;
use import_profile_core::SourceType;
use import_profile_core::SourceUrl;
use import_profile_core::StoreError;
use import_profile_core::Timestamp;
use import_profile_store_sqlite::SqliteProfileStore;
use import_profile_store_sqlite::SqliteStoreConfig;
use import_profile_store_sqlite::SqliteStoreError;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn profile(
    id: &str,
    url: &str,
    screen_name: Option<&str>,
    last_modified: i64,
) -> ImportProfileEntry {
    let mut extra = BTreeMap::new();
    extra.insert("importer".to_string(), json!("harvester-1"));
    ImportProfileEntry {
        id: ProfileId::new(id),
        source_url: SourceUrl::parse(url).unwrap(),
        source_type: if screen_name.is_some() { SourceType::Twitter } else { SourceType::Rss },
        screen_name: screen_name.map(str::to_string),
        client_host: Some("10.1.1.1".to_string()),
        harvesting_freq: Some(30),
        lifetime: None,
        privacy_status: None,
        created_at: Some(Timestamp::from_unix_millis(1_000)),
        last_modified: Timestamp::from_unix_millis(last_modified),
        extra,
    }
}

fn open(path: &Path) -> SqliteProfileStore {
    SqliteProfileStore::new(&SqliteStoreConfig::for_path(path)).unwrap()
}

// ============================================================================
// SECTION: Persistence
// ============================================================================

#[test]
fn profiles_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("profiles.sqlite");
    let original = profile("p1", "https://example.org/feed", None, 10);
    {
        let store = open(&path);
        assert!(store.upsert(&original).unwrap());
    }
    let store = open(&path);
    let loaded = store.find_by_id(&ProfileId::new("p1")).unwrap().unwrap();
    assert_eq!(loaded, original);
    assert!(store.find_by_id(&ProfileId::new("missing")).unwrap().is_none());
}

#[test]
fn upsert_replaces_existing_document() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir.path().join("profiles.sqlite"));
    store.upsert(&profile("p1", "https://example.org/feed", None, 10)).unwrap();
    store.upsert(&profile("p1", "https://example.org/other", None, 11)).unwrap();
    let all = store.find_by_constraints(&ConstraintSet::new(), ResultOrder::Unordered).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].source_url.as_str(), "https://example.org/other");
}

#[test]
fn creates_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("profiles.sqlite");
    let store = open(&path);
    store.upsert(&profile("p1", "https://example.org/feed", None, 1)).unwrap();
    assert!(path.exists());
}

#[test]
fn directory_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let result = SqliteProfileStore::new(&SqliteStoreConfig::for_path(dir.path()));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

// ============================================================================
// SECTION: Lookup
// ============================================================================

#[test]
fn latest_first_orders_newest_first() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir.path().join("profiles.sqlite"));
    for (id, modified) in [("a", 3), ("b", 9), ("c", 6)] {
        store.upsert(&profile(id, "https://example.org/feed", None, modified)).unwrap();
    }
    let ids: Vec<String> = store
        .find_by_constraints(&ConstraintSet::new(), ResultOrder::LatestFirst)
        .unwrap()
        .into_iter()
        .map(|entry| entry.id.as_str().to_string())
        .collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
}

#[test]
fn text_constraints_over_match_and_source_type_is_exact() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir.path().join("profiles.sqlite"));
    store.upsert(&profile("exact", "https://example.org/feed", Some("alice"), 1)).unwrap();
    store.upsert(&profile("case", "https://Example.org/Feed/more", Some("ALICE"), 2)).unwrap();
    store.upsert(&profile("other", "https://example.org/feed", Some("bob"), 3)).unwrap();
    store.upsert(&profile("rss", "https://example.org/feed", None, 4)).unwrap();

    let constraints = ConstraintSet::new()
        .with(ConstraintField::SourceUrl, "https://example.org/feed")
        .with(ConstraintField::ScreenName, "alice");
    let mut ids: Vec<String> = store
        .find_by_constraints(&constraints, ResultOrder::Unordered)
        .unwrap()
        .into_iter()
        .map(|entry| entry.id.as_str().to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["case", "exact"]);

    let by_type = ConstraintSet::new().with(ConstraintField::SourceType, "RSS");
    let found = store.find_by_constraints(&by_type, ResultOrder::Unordered).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id.as_str(), "rss");
}

#[test]
fn delete_handler_removes_only_exact_match() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir.path().join("profiles.sqlite"));
    store.upsert(&profile("exact", "https://example.org/feed", Some("alice"), 1)).unwrap();
    store.upsert(&profile("case", "https://example.org/feed", Some("Alice"), 2)).unwrap();
    let request = DeleteRequest {
        source_url: Some("https://example.org/feed".to_string()),
        screen_name: Some("alice".to_string()),
        ..DeleteRequest::default()
    };
    let report = DeleteHandler::new(&store).handle(&request).unwrap();
    assert_eq!(report.records, 1);
    assert!(store.find_by_id(&ProfileId::new("exact")).unwrap().is_none());
    assert!(store.find_by_id(&ProfileId::new("case")).unwrap().is_some());
}

#[test]
fn delete_handler_removes_exact_non_ascii_match() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir.path().join("profiles.sqlite"));
    store.upsert(&profile("greek", "https://example.org/feed", Some("ΑΣ.Β"), 1)).unwrap();
    let constraints = ConstraintSet::new().with(ConstraintField::ScreenName, "ΑΣ.Β");
    assert_eq!(store.find_by_constraints(&constraints, ResultOrder::Unordered).unwrap().len(), 1);
    let request = DeleteRequest {
        source_url: Some("https://example.org/feed".to_string()),
        screen_name: Some("ΑΣ.Β".to_string()),
        ..DeleteRequest::default()
    };
    let report = DeleteHandler::new(&store).handle(&request).unwrap();
    assert_eq!(report.records, 1);
    assert!(store.find_by_id(&ProfileId::new("greek")).unwrap().is_none());
}

// ============================================================================
// SECTION: Deletion
// ============================================================================

#[test]
fn delete_requires_stored_source_type() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir.path().join("profiles.sqlite"));
    store.upsert(&profile("p1", "https://example.org/feed", None, 1)).unwrap();
    assert!(!store.delete_by_id(&ProfileId::new("p1"), SourceType::Geojson).unwrap());
    assert!(store.delete_by_id(&ProfileId::new("p1"), SourceType::Rss).unwrap());
    assert!(!store.delete_by_id(&ProfileId::new("p1"), SourceType::Rss).unwrap());
}

// ============================================================================
// SECTION: Integrity
// ============================================================================

#[test]
fn tampered_document_fails_closed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("profiles.sqlite");
    let store = open(&path);
    store.upsert(&profile("p1", "https://example.org/feed", None, 1)).unwrap();
    let other = serde_json::to_vec(&profile("p2", "https://example.org/feed", None, 1)).unwrap();
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection
            .execute("UPDATE import_profiles SET profile_json = ?1 WHERE id = 'p1'", [other])
            .unwrap();
    }
    let err = store.find_by_id(&ProfileId::new("p1")).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
}

#[test]
fn unsupported_schema_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("profiles.sqlite");
    drop(open(&path));
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection.execute("UPDATE store_meta SET version = 99", []).unwrap();
    }
    let result = SqliteProfileStore::new(&SqliteStoreConfig::for_path(&path));
    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}
