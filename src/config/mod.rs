//! Configuration management for navydash
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables (`MONGO_URL`, `NAVYDASH_*`, optionally from a `.env` file)
//! - Command-line arguments (applied by the CLI layer)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Query construction settings
    #[serde(default)]
    pub query: QueryConfig,

    /// Page-browse settings
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// CSV export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// MongoDB connection URI
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database holding the telemetry collection
    #[serde(default = "default_database")]
    pub database: String,

    /// Telemetry collection name
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Application name reported to the server
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Maximum pool size
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,

    /// Minimum pool size
    #[serde(default)]
    pub min_pool_size: u32,

    /// Pooled connection idle timeout in milliseconds
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Socket connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Server selection timeout in milliseconds
    #[serde(default = "default_server_selection_timeout_ms")]
    pub server_selection_timeout_ms: u64,

    /// Budget for creating the client and confirming it with a ping
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// Optional read preference (e.g. prefer secondaries for exports)
    #[serde(default)]
    pub read_preference: Option<ReadPreferenceMode>,
}

/// Read preference modes understood by the connection provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReadPreferenceMode {
    Primary,
    PrimaryPreferred,
    Secondary,
    SecondaryPreferred,
    Nearest,
}

/// Query construction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Field holding the ISO-8601 sample timestamp
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,

    /// Store-assigned identity field
    #[serde(default = "default_identity_field")]
    pub identity_field: String,

    /// Status field constrained in Check mode
    #[serde(default = "default_status_field")]
    pub status_field: String,

    /// Lower bound of the Check band (inclusive)
    #[serde(default)]
    pub status_min: i64,

    /// Upper bound of the Check band (inclusive)
    #[serde(default = "default_status_max")]
    pub status_max: i64,

    /// Whether the end timestamp is part of the range
    #[serde(default)]
    pub end_bound: EndBound,

    /// Ask the server to use the `{timestamp: 1, identity: 1}` index
    ///
    /// Turning this off also leaves exports unsorted.
    #[serde(default = "default_true")]
    pub index_hint: bool,
}

/// Inclusivity of the range's upper bound
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EndBound {
    /// `timestamp <= end`
    #[default]
    Inclusive,
    /// `timestamp < end`
    Exclusive,
}

/// Page-browse settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Number of records per page
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Time budget for counting matches, in milliseconds
    #[serde(default = "default_count_budget_ms")]
    pub count_budget_ms: u64,
}

/// CSV export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Rows handed to the CSV writer per flush
    #[serde(default = "default_export_batch_size")]
    pub batch_size: usize,

    /// Documents requested from the server per cursor round trip
    #[serde(default = "default_cursor_batch_size")]
    pub cursor_batch_size: u32,

    /// Fields to retrieve; `None` retrieves every field
    #[serde(default)]
    pub projection: Option<Vec<String>>,

    /// What to do with records whose fields differ from the header
    #[serde(default)]
    pub schema_policy: SchemaPolicy,

    /// What to do with already-streamed rows when the store fails mid-export
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Directory receiving exported files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Show a progress bar while exporting
    #[serde(default = "default_true")]
    pub progress: bool,
}

/// Handling of records whose field set differs from the first record
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaPolicy {
    /// Extra fields are dropped, missing fields render empty
    #[default]
    DropExtra,
    /// Extra fields abort the export
    Strict,
}

/// Handling of rows streamed before a mid-export store failure
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Drop everything and report the error
    #[default]
    Discard,
    /// Keep the rows but mark the outcome as partial
    FlagPartial,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "iotdb".to_string()
}

fn default_collection() -> String {
    "navy".to_string()
}

fn default_app_name() -> String {
    "navydash".to_string()
}

fn default_max_pool_size() -> u32 {
    50
}

fn default_idle_timeout_ms() -> u64 {
    45_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_server_selection_timeout_ms() -> u64 {
    5_000
}

fn default_acquire_timeout_ms() -> u64 {
    10_000
}

fn default_timestamp_field() -> String {
    "timestamp".to_string()
}

fn default_identity_field() -> String {
    "_id".to_string()
}

fn default_status_field() -> String {
    "Genset_Run_SS".to_string()
}

fn default_status_max() -> i64 {
    2
}

fn default_page_size() -> u64 {
    100
}

fn default_count_budget_ms() -> u64 {
    5_000
}

fn default_export_batch_size() -> usize {
    1000
}

fn default_cursor_batch_size() -> u32 {
    10_000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_true() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: default_database(),
            collection: default_collection(),
            app_name: default_app_name(),
            max_pool_size: default_max_pool_size(),
            min_pool_size: 0,
            idle_timeout_ms: default_idle_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            server_selection_timeout_ms: default_server_selection_timeout_ms(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            read_preference: None,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timestamp_field: default_timestamp_field(),
            identity_field: default_identity_field(),
            status_field: default_status_field(),
            status_min: 0,
            status_max: default_status_max(),
            end_bound: EndBound::default(),
            index_hint: true,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            count_budget_ms: default_count_budget_ms(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_export_batch_size(),
            cursor_batch_size: default_cursor_batch_size(),
            projection: None,
            schema_policy: SchemaPolicy::default(),
            failure_policy: FailurePolicy::default(),
            output_dir: default_output_dir(),
            progress: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: true,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    ///
    /// An explicit path must exist. Without a path the default location is
    /// tried, and defaults are used when nothing is there.
    ///
    /// # Arguments
    /// * `path` - Optional path to a TOML configuration file
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::FileNotFound(path.display().to_string()).into());
            }
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Serialize configuration as TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Apply environment overrides from the process environment
    ///
    /// `MONGO_URL` sets the connection URI; `NAVYDASH_DATABASE`,
    /// `NAVYDASH_COLLECTION`, `NAVYDASH_PAGE_SIZE`, `NAVYDASH_MAX_POOL_SIZE`
    /// and `NAVYDASH_OUTPUT_DIR` override their fields.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup("MONGO_URL") {
            self.connection.uri = uri;
        }
        if let Some(db) = lookup("NAVYDASH_DATABASE") {
            self.connection.database = db;
        }
        if let Some(coll) = lookup("NAVYDASH_COLLECTION") {
            self.connection.collection = coll;
        }
        if let Some(value) = lookup("NAVYDASH_PAGE_SIZE") {
            self.pagination.page_size = parse_env("NAVYDASH_PAGE_SIZE", &value)?;
        }
        if let Some(value) = lookup("NAVYDASH_MAX_POOL_SIZE") {
            self.connection.max_pool_size = parse_env("NAVYDASH_MAX_POOL_SIZE", &value)?;
        }
        if let Some(dir) = lookup("NAVYDASH_OUTPUT_DIR") {
            self.export.output_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".navydash")
            .join("config.toml")
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        let conn = &self.connection;
        if conn.uri.trim().is_empty() {
            return Err(invalid("connection.uri", &conn.uri));
        }
        if conn.database.is_empty() {
            return Err(invalid("connection.database", &conn.database));
        }
        if conn.collection.is_empty() {
            return Err(invalid("connection.collection", &conn.collection));
        }
        if conn.max_pool_size == 0 {
            return Err(invalid("connection.max_pool_size", "0"));
        }
        if conn.min_pool_size > conn.max_pool_size {
            return Err(invalid(
                "connection.min_pool_size",
                &conn.min_pool_size.to_string(),
            ));
        }
        if self.query.status_min > self.query.status_max {
            return Err(invalid(
                "query.status_min",
                &format!("{} > {}", self.query.status_min, self.query.status_max),
            ));
        }
        if self.query.timestamp_field.is_empty() {
            return Err(invalid("query.timestamp_field", ""));
        }
        if self.pagination.page_size == 0 {
            return Err(invalid("pagination.page_size", "0"));
        }
        if self.export.batch_size == 0 {
            return Err(invalid("export.batch_size", "0"));
        }
        if self.export.cursor_batch_size == 0 {
            return Err(invalid("export.cursor_batch_size", "0"));
        }
        Ok(())
    }

    /// Get count budget as Duration
    pub fn count_budget(&self) -> Duration {
        Duration::from_millis(self.pagination.count_budget_ms)
    }
}

impl ConnectionConfig {
    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get server selection timeout as Duration
    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Get connection acquisition budget as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn invalid(field: &str, value: &str) -> crate::error::DashboardError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}
