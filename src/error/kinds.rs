use std::time::Duration;
use std::{fmt, io};

/// Crate-wide `Result` type using [`DashboardError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Top-level error type for navydash operations.
///
/// Every store-facing component converts its failures into one of these
/// kinds before returning, so callers never see a raw driver error.
#[derive(Debug)]
pub enum DashboardError {
    /// User input rejected before any store access.
    Validation(ValidationError),

    /// Store unreachable or connection could not be acquired in time.
    Connection(ConnectionError),

    /// Count exceeded its time budget. Callers degrade this to "unknown".
    CountTimeout { budget: Duration },

    /// Page retrieval failed.
    Fetch(String),

    /// Export aborted mid-stream.
    Export(ExportError),

    /// Navigation requested in a state that does not allow it.
    Pagination(PaginationError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),
}

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// End date lies before start date.
    EndDateBeforeStart,

    /// Combined end date-time is not after the combined start date-time.
    EndNotAfterStart,

    /// A date or time string could not be parsed.
    InvalidInput { field: String, value: String },

    /// Page size or other limit must be positive.
    InvalidLimit(String),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// Connection could not be acquired within the configured budget.
    Timeout(Duration),

    /// Invalid connection URI.
    InvalidUri(String),

    /// Store became unavailable during an operation.
    Unavailable(String),
}

/// Export-specific errors.
#[derive(Debug)]
pub enum ExportError {
    /// The cursor or query failed after some records had been streamed.
    StoreFailure {
        records_streamed: u64,
        message: String,
    },

    /// A record carried fields the header does not know about (strict schema mode).
    SchemaMismatch { record: u64, fields: Vec<String> },

    /// CSV encoding failed.
    Encoding(String),

    /// The export was cancelled before the cursor was exhausted.
    Cancelled { records_streamed: u64 },

    /// Writing the artifact failed.
    Artifact(String),
}

/// Pagination state machine errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationError {
    /// No query submitted, or its count is not yet known.
    NotReady,

    /// A count was resolved while no count was pending.
    NoPendingCount,
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/* ========================= Helpers ========================= */

impl DashboardError {
    /// Whether the user can simply correct input or retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DashboardError::Validation(_)
                | DashboardError::CountTimeout { .. }
                | DashboardError::Pagination(_)
        )
    }

    /// Whether this is a count budget overrun.
    pub fn is_count_timeout(&self) -> bool {
        matches!(self, DashboardError::CountTimeout { .. })
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::Validation(e) => write!(f, "{e}"),
            DashboardError::Connection(e) => write!(f, "Connection error: {e}"),
            DashboardError::CountTimeout { budget } => {
                write!(f, "Count did not finish within {} ms", budget.as_millis())
            }
            DashboardError::Fetch(msg) => write!(f, "Fetch failed: {msg}"),
            DashboardError::Export(e) => write!(f, "Export failed: {e}"),
            DashboardError::Pagination(e) => write!(f, "Pagination error: {e}"),
            DashboardError::Config(e) => write!(f, "Configuration error: {e}"),
            DashboardError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EndDateBeforeStart => {
                write!(f, "End Date must be greater than or equal to Start Date.")
            }
            ValidationError::EndNotAfterStart => {
                write!(f, "End Date-Time must be greater than Start Date-Time.")
            }
            ValidationError::InvalidInput { field, value } => {
                write!(f, "Invalid {field}: '{value}'")
            }
            ValidationError::InvalidLimit(msg) => write!(f, "Invalid limit: {msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::Timeout(budget) => write!(
                f,
                "Connection not acquired within {} ms",
                budget.as_millis()
            ),
            ConnectionError::InvalidUri(uri) => write!(f, "Invalid connection URI: {uri}"),
            ConnectionError::Unavailable(msg) => write!(f, "Store unavailable: {msg}"),
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::StoreFailure {
                records_streamed,
                message,
            } => write!(
                f,
                "store error after {records_streamed} records, output discarded: {message}"
            ),
            ExportError::SchemaMismatch { record, fields } => write!(
                f,
                "record {record} has fields not present in the header: {}",
                fields.join(", ")
            ),
            ExportError::Encoding(msg) => write!(f, "CSV encoding error: {msg}"),
            ExportError::Cancelled { records_streamed } => {
                write!(f, "cancelled after {records_streamed} records")
            }
            ExportError::Artifact(msg) => write!(f, "could not write file: {msg}"),
        }
    }
}

impl fmt::Display for PaginationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaginationError::NotReady => write!(f, "no query with a known count is active"),
            PaginationError::NoPendingCount => write!(f, "no count is pending"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for DashboardError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for ExportError {}
impl std::error::Error for PaginationError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to DashboardError ========================= */

impl From<io::Error> for DashboardError {
    fn from(err: io::Error) -> Self {
        DashboardError::Io(err)
    }
}

impl From<ValidationError> for DashboardError {
    fn from(err: ValidationError) -> Self {
        DashboardError::Validation(err)
    }
}

impl From<ConnectionError> for DashboardError {
    fn from(err: ConnectionError) -> Self {
        DashboardError::Connection(err)
    }
}

impl From<ExportError> for DashboardError {
    fn from(err: ExportError) -> Self {
        DashboardError::Export(err)
    }
}

impl From<PaginationError> for DashboardError {
    fn from(err: PaginationError) -> Self {
        DashboardError::Pagination(err)
    }
}

impl From<ConfigError> for DashboardError {
    fn from(err: ConfigError) -> Self {
        DashboardError::Config(err)
    }
}
