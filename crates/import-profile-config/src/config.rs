// crates/import-profile-config/src/config.rs
// ============================================================================
// Module: Import Profile Configuration
// Description: Configuration loading and validation for the import profile service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: import-profile-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. Every section has defaults,
//! so an empty file yields a loopback, in-memory service without an abuse
//! gate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use import_profile_store_sqlite::SqliteStoreMode;
use import_profile_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "import-profile.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "IMPORT_PROFILE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the HTTP route.
pub(crate) const MAX_ROUTE_LENGTH: usize = 256;
/// Maximum request body size accepted by configuration.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Minimum allowed abuse gate window in milliseconds.
pub(crate) const MIN_GATE_WINDOW_MS: u64 = 100;
/// Maximum allowed abuse gate window in milliseconds.
pub(crate) const MAX_GATE_WINDOW_MS: u64 = 60_000;
/// Maximum allowed requests per abuse gate window.
pub(crate) const MAX_GATE_REQUESTS: u32 = 100_000;
/// Maximum allowed blackout in milliseconds.
pub(crate) const MAX_GATE_BLACKOUT_MS: u64 = 3_600_000;
/// Maximum number of tracked abuse gate entries.
pub(crate) const MAX_GATE_ENTRIES: usize = 65_536;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Import profile service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportProfileConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Profile store configuration.
    #[serde(default)]
    pub store: ProfileStoreConfig,
}

impl ImportProfileConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Path serving the import profile endpoint.
    #[serde(default = "default_route")]
    pub route: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Optional per-client abuse gate; absent means disabled.
    #[serde(default)]
    pub abuse_gate: Option<AbuseGateConfig>,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            route: default_route(),
            max_body_bytes: default_max_body_bytes(),
            abuse_gate: None,
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if !self.route.starts_with('/') {
            return Err(ConfigError::Invalid("server.route must start with '/'".to_string()));
        }
        if self.route.len() > MAX_ROUTE_LENGTH {
            return Err(ConfigError::Invalid("server.route exceeds max length".to_string()));
        }
        if self.route.chars().any(|c| c.is_whitespace() || c == '{' || c == '}') {
            return Err(ConfigError::Invalid(
                "server.route must not contain whitespace or braces".to_string(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid("max_body_bytes too large".to_string()));
        }
        if let Some(gate) = &self.abuse_gate {
            gate.validate()?;
        }
        self.audit.validate()
    }
}

/// Per-client abuse gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AbuseGateConfig {
    /// Maximum requests per window.
    #[serde(default = "default_gate_max_requests")]
    pub max_requests: u32,
    /// Window duration in milliseconds.
    #[serde(default = "default_gate_window_ms")]
    pub window_ms: u64,
    /// Blackout applied after the budget is exceeded, in milliseconds.
    #[serde(default = "default_gate_blackout_ms")]
    pub blackout_ms: u64,
    /// Maximum number of tracked clients.
    #[serde(default = "default_gate_max_entries")]
    pub max_entries: usize,
}

impl Default for AbuseGateConfig {
    fn default() -> Self {
        Self {
            max_requests: default_gate_max_requests(),
            window_ms: default_gate_window_ms(),
            blackout_ms: default_gate_blackout_ms(),
            max_entries: default_gate_max_entries(),
        }
    }
}

impl AbuseGateConfig {
    /// Validates abuse gate settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_requests == 0 {
            return Err(ConfigError::Invalid(
                "abuse_gate max_requests must be greater than zero".to_string(),
            ));
        }
        if self.max_requests > MAX_GATE_REQUESTS {
            return Err(ConfigError::Invalid("abuse_gate max_requests too large".to_string()));
        }
        if !(MIN_GATE_WINDOW_MS ..= MAX_GATE_WINDOW_MS).contains(&self.window_ms) {
            return Err(ConfigError::Invalid(format!(
                "abuse_gate window_ms must be between {MIN_GATE_WINDOW_MS} and \
                 {MAX_GATE_WINDOW_MS}",
            )));
        }
        if self.blackout_ms > MAX_GATE_BLACKOUT_MS {
            return Err(ConfigError::Invalid("abuse_gate blackout_ms too large".to_string()));
        }
        if self.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "abuse_gate max_entries must be greater than zero".to_string(),
            ));
        }
        if self.max_entries > MAX_GATE_ENTRIES {
            return Err(ConfigError::Invalid("abuse_gate max_entries too large".to_string()));
        }
        Ok(())
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Profile store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileStoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: ProfileStoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for ProfileStoreConfig {
    fn default() -> Self {
        Self {
            store_type: ProfileStoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl ProfileStoreConfig {
    /// Validates profile store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            ProfileStoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            ProfileStoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())
            }
        }
    }
}

/// Profile store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use `SQLite`-backed durable store.
    Sqlite,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default bind address.
fn default_bind() -> String {
    "127.0.0.1:9000".to_string()
}

/// Default endpoint route.
fn default_route() -> String {
    "/api/import.json".to_string()
}

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default requests per abuse gate window.
const fn default_gate_max_requests() -> u32 {
    100
}

/// Default abuse gate window.
const fn default_gate_window_ms() -> u64 {
    10_000
}

/// Default abuse gate blackout.
const fn default_gate_blackout_ms() -> u64 {
    60_000
}

/// Default tracked client cap.
const fn default_gate_max_entries() -> usize {
    4_096
}

/// Default audit enabled flag.
const fn default_audit_enabled() -> bool {
    true
}

/// Default `SQLite` busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Tests
// ============================================================================
