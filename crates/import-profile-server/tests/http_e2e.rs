// crates/import-profile-server/tests/http_e2e.rs
// ============================================================================
// Module: HTTP End-to-End Tests
// Description: Drive the server over a real socket with reqwest.
// Purpose: Validate routing, status codes, and durable round trips.
// Dependencies: import-profile-server, import-profile-config, reqwest, tokio
// ============================================================================

//! ## Overview
//! Binds an ephemeral loopback port, serves the configured route, and issues
//! real HTTP requests against it. The SQLite backend is exercised so that
//! update and delete results are observed through the store on disk.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::net::SocketAddr;
use std::path::Path;

use import_profile_config::ImportProfileConfig;
use import_profile_core::ImportProfileEntry;
use import_profile_core::ProfileId;
use import_profile_core::ProfileStore;
use import_profile_core::SourceType;
use import_profile_core::SourceUrl;
use import_profile_core::Timestamp;
use import_profile_server::ImportProfileServer;
use import_profile_store_sqlite::SqliteProfileStore;
use import_profile_store_sqlite::SqliteStoreConfig;
use serde_json::Value;
use tokio::net::TcpListener;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const FORM: &str = "application/x-www-form-urlencoded";

fn config_toml(db_path: &Path) -> String {
    format!(
        "[server]\nbind = \"127.0.0.1:0\"\nroute = \"/api/import.json\"\n\n[server.audit]\nenabled \
         = false\n\n[store]\ntype = \"sqlite\"\npath = \"{}\"\n",
        db_path.display()
    )
}

async fn spawn_server(config: ImportProfileConfig) -> SocketAddr {
    let server = ImportProfileServer::from_config(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve_on(listener));
    addr
}

fn seed(db_path: &Path, entries: &[ImportProfileEntry]) {
    let store = SqliteProfileStore::new(&SqliteStoreConfig::for_path(db_path)).unwrap();
    for entry in entries {
        store.upsert(entry).unwrap();
    }
}

fn entry(id: &str, screen_name: &str) -> ImportProfileEntry {
    ImportProfileEntry {
        id: ProfileId::new(id),
        source_url: SourceUrl::parse("https://example.org/statuses").unwrap(),
        source_type: SourceType::Twitter,
        screen_name: Some(screen_name.to_string()),
        client_host: Some("10.1.1.1".to_string()),
        harvesting_freq: Some(30),
        lifetime: None,
        privacy_status: None,
        created_at: None,
        last_modified: Timestamp::from_unix_millis(1_000),
        extra: std::collections::BTreeMap::new(),
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn search_update_and_delete_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("profiles.sqlite");
    seed(&db_path, &[entry("t1", "alice"), entry("t2", "Alice")]);
    let config = ImportProfileConfig::parse(&config_toml(&db_path)).unwrap();
    let addr = spawn_server(config).await;
    let base = format!("http://{addr}/api/import.json");
    let client = reqwest::Client::new();

    let response = client.get(format!("{base}?source_type=TWITTER")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["search_metadata"]["count"], 2);
    assert_eq!(body["search_metadata"]["client"], "127.0.0.1");

    let data = r#"{"id_str":"t1","source_url":"https://example.org/statuses",
        "source_type":"TWITTER","screen_name":"alice","harvesting_freq":5}"#;
    let response = client
        .post(&base)
        .header("content-type", FORM)
        .body(format!("action=update&data={}", encode(data)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"status": "ok", "records": 1, "message": "updated"}));

    let query = format!(
        "action=delete&source_url={}&screen_name=alice",
        encode("https://example.org/statuses")
    );
    let response = client.get(format!("{base}?{query}")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["records"], 1);

    let store = SqliteProfileStore::new(&SqliteStoreConfig::for_path(&db_path)).unwrap();
    assert!(store.find_by_id(&ProfileId::new("t1")).unwrap().is_none());
    assert!(store.find_by_id(&ProfileId::new("t2")).unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn errors_map_to_bad_request_and_jsonp_wraps_success() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("profiles.sqlite");
    let config = ImportProfileConfig::parse(&config_toml(&db_path)).unwrap();
    let addr = spawn_server(config).await;
    let base = format!("http://{addr}/api/import.json");
    let client = reqwest::Client::new();

    let response = client.get(format!("{base}?action=update")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "your request must contain a data object.");

    let response =
        client.get(format!("{base}?callback=handle&minified=true")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("application/javascript"));
    let text = response.text().await.unwrap();
    assert!(text.starts_with("handle({"));
    assert!(text.contains("\"search_metadata\":{\"client\":\"127.0.0.1\",\"count\":0}"));

    let response = client.get(format!("{base}?action=delete")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client.get(format!("http://{addr}/other")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test(flavor = "multi_thread")]
async fn abuse_gate_answers_503() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("profiles.sqlite");
    let gate = "\n[server.abuse_gate]\nmax_requests = 1\nwindow_ms = 60000\nblackout_ms = 60000\n";
    let toml = config_toml(&db_path).replace("[store]", &format!("{gate}\n[store]"));
    let config = ImportProfileConfig::parse(&toml).unwrap();
    let addr = spawn_server(config).await;
    let base = format!("http://{addr}/api/import.json");
    let client = reqwest::Client::new();

    assert_eq!(client.get(&base).send().await.unwrap().status().as_u16(), 200);
    let response = client.get(&base).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "your request frequency is too high");
}
