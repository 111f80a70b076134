// crates/import-profile-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Profile Store
// Description: Durable ProfileStore backed by SQLite WAL.
// Purpose: Persist import profiles as JSON documents with lookup columns.
// Dependencies: import-profile-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`ProfileStore`] using `SQLite`. Each
//! profile is stored as a JSON document plus analyzed term copies of the
//! constrained fields. Text constraints are analyzed into terms and matched
//! with `LIKE '%term%'` against the folded columns, which over-matches the
//! way a full-text index does. Source type constraints compare exactly.
//! Loads fail closed when a document disagrees with its key.

// ============================================================================//
// SECTION: Imports
// ============================================================================//

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use import_profile_core::ConstraintField;
use import_profile_core::ConstraintSet;
use import_profile_core::ImportProfileEntry;
use import_profile_core::ProfileId;
use import_profile_core::ProfileStore;
use import_profile_core::ResultOrder;
use import_profile_core::SourceType;
use import_profile_core::StoreError;
use import_profile_core::core::query::analyze;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use rusqlite::params_from_iter;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================//
// SECTION: Constants
// ============================================================================//

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum serialized profile size accepted by the store.
pub const MAX_PROFILE_BYTES: usize = 1024 * 1024;

// ============================================================================//
// SECTION: Config
// ============================================================================//

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` profile store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a config with default tuning for `path`.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================//
// SECTION: Errors
// ============================================================================//

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored document disagrees with its row.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Store payload exceeded configured size limits.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "profile_json exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

/// Maps an engine error into the store taxonomy.
fn db_error(err: &rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================//
// SECTION: Store
// ============================================================================//

/// `SQLite`-backed profile store with WAL support.
#[derive(Clone)]
pub struct SqliteProfileStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteProfileStore {
    /// Opens an `SQLite`-backed profile store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Loads one profile by id.
    fn load_profile(&self, id: &ProfileId) -> Result<Option<ImportProfileEntry>, SqliteStoreError> {
        let bytes: Option<Vec<u8>> = {
            let guard = self.lock()?;
            let bytes = guard
                .query_row(
                    "SELECT profile_json FROM import_profiles WHERE id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| db_error(&err))?;
            drop(guard);
            bytes
        };
        bytes.map(|bytes| decode_profile(id.as_str(), &bytes)).transpose()
    }

    /// Runs a constraint lookup.
    fn query_profiles(
        &self,
        constraints: &ConstraintSet,
        order: ResultOrder,
    ) -> Result<Vec<ImportProfileEntry>, SqliteStoreError> {
        let (sql, args) = constraint_query(constraints, order);
        let rows: Vec<(String, Vec<u8>)> = {
            let guard = self.lock()?;
            let mut statement = guard.prepare(&sql).map_err(|err| db_error(&err))?;
            let rows = statement
                .query_map(params_from_iter(args.iter()), |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(|err| db_error(&err))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| db_error(&err))?;
            drop(statement);
            drop(guard);
            rows
        };
        rows.iter().map(|(id, bytes)| decode_profile(id, bytes)).collect()
    }

    /// Inserts or replaces one profile.
    fn write_profile(&self, entry: &ImportProfileEntry) -> Result<bool, SqliteStoreError> {
        let bytes =
            serde_json::to_vec(entry).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if bytes.len() > MAX_PROFILE_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_PROFILE_BYTES,
                actual_bytes: bytes.len(),
            });
        }
        let changed = {
            let guard = self.lock()?;
            let changed = guard
                .execute(
                    "INSERT INTO import_profiles (id, source_type, source_url_folded, \
                     screen_name_folded, client_host_folded, last_modified, profile_json) VALUES \
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7) ON CONFLICT(id) DO UPDATE SET source_type = \
                     excluded.source_type, source_url_folded = excluded.source_url_folded, \
                     screen_name_folded = excluded.screen_name_folded, client_host_folded = \
                     excluded.client_host_folded, last_modified = excluded.last_modified, \
                     profile_json = excluded.profile_json",
                    params![
                        entry.id.as_str(),
                        entry.source_type.as_str(),
                        fold(entry.source_url.as_str()),
                        entry.screen_name.as_deref().map(fold),
                        entry.client_host.as_deref().map(fold),
                        entry.last_modified.as_unix_millis(),
                        bytes
                    ],
                )
                .map_err(|err| db_error(&err))?;
            drop(guard);
            changed
        };
        Ok(changed > 0)
    }

    /// Removes one profile stored under `source_type`.
    fn remove_profile(
        &self,
        id: &ProfileId,
        source_type: SourceType,
    ) -> Result<bool, SqliteStoreError> {
        let guard = self.lock()?;
        let removed = guard
            .execute(
                "DELETE FROM import_profiles WHERE id = ?1 AND source_type = ?2",
                params![id.as_str(), source_type.as_str()],
            )
            .map_err(|err| db_error(&err))?;
        drop(guard);
        Ok(removed == 1)
    }
}

impl ProfileStore for SqliteProfileStore {
    fn find_by_id(&self, id: &ProfileId) -> Result<Option<ImportProfileEntry>, StoreError> {
        self.load_profile(id).map_err(StoreError::from)
    }

    fn find_by_constraints(
        &self,
        constraints: &ConstraintSet,
        order: ResultOrder,
    ) -> Result<Vec<ImportProfileEntry>, StoreError> {
        self.query_profiles(constraints, order).map_err(StoreError::from)
    }

    fn upsert(&self, entry: &ImportProfileEntry) -> Result<bool, StoreError> {
        self.write_profile(entry).map_err(StoreError::from)
    }

    fn delete_by_id(&self, id: &ProfileId, source_type: SourceType) -> Result<bool, StoreError> {
        self.remove_profile(id, source_type).map_err(StoreError::from)
    }
}

// ============================================================================//
// SECTION: Query Building
// ============================================================================//

/// Folds a field into the space-joined terms that lookups match against.
fn fold(value: &str) -> String {
    analyze(value).into_iter().collect::<Vec<_>>().join(" ")
}

/// Builds the lookup SQL and its positional arguments.
fn constraint_query(constraints: &ConstraintSet, order: ResultOrder) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut args = Vec::new();
    for (field, value) in constraints.iter() {
        let column = match field {
            ConstraintField::SourceType => {
                args.push(value.to_string());
                clauses.push(format!("source_type = ?{}", args.len()));
                continue;
            }
            ConstraintField::SourceUrl => "source_url_folded",
            ConstraintField::ScreenName => "screen_name_folded",
            ConstraintField::ClientHost => "client_host_folded",
        };
        clauses.push(format!("{column} IS NOT NULL"));
        for term in analyze(value) {
            args.push(format!("%{term}%"));
            clauses.push(format!("{column} LIKE ?{}", args.len()));
        }
    }
    let mut sql = "SELECT id, profile_json FROM import_profiles".to_string();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    if order == ResultOrder::LatestFirst {
        sql.push_str(" ORDER BY last_modified DESC, id ASC");
    }
    (sql, args)
}

/// Decodes a stored document and checks it against its key.
fn decode_profile(id: &str, bytes: &[u8]) -> Result<ImportProfileEntry, SqliteStoreError> {
    if bytes.len() > MAX_PROFILE_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_PROFILE_BYTES,
            actual_bytes: bytes.len(),
        });
    }
    let entry: ImportProfileEntry =
        serde_json::from_slice(bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if entry.id.as_str() != id {
        return Err(SqliteStoreError::Corrupt(format!("id mismatch for profile {id}")));
    }
    Ok(entry)
}

// ============================================================================//
// SECTION: Helpers
// ============================================================================//

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection =
        Connection::open_with_flags(&config.path, flags).map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| db_error(&err))?;
    Ok(connection)
}

/// Initializes the `SQLite` schema or validates existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| db_error(&err))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| db_error(&err))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| db_error(&err))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| db_error(&err))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS import_profiles (
                    id TEXT PRIMARY KEY,
                    source_type TEXT NOT NULL,
                    source_url_folded TEXT NOT NULL,
                    screen_name_folded TEXT,
                    client_host_folded TEXT,
                    last_modified INTEGER NOT NULL,
                    profile_json BLOB NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_import_profiles_source_type
                    ON import_profiles (source_type);
                CREATE INDEX IF NOT EXISTS idx_import_profiles_last_modified
                    ON import_profiles (last_modified);",
            )
            .map_err(|err| db_error(&err))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| db_error(&err))?;
    Ok(())
}

// ============================================================================//
// SECTION: Tests
// ============================================================================//
