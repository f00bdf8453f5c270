//! Document store abstraction
//!
//! The dashboard core only needs a narrow slice of a document database:
//! counting matches for a range query and opening a cursor over them with
//! sort/skip/limit/hint/batch-size/projection. This module defines that
//! contract so the components can run against MongoDB in production and
//! against an in-process store in tests.
//!
//! # Components
//!
//! 1. **DocumentStore**: count and find over a [`RangeQuery`]
//! 2. **RecordCursor**: batched cursor with an explicit `close`
//! 3. **StoreError**: store-level failures, classified before they leave this module

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::Document;
use uuid::Uuid;

use crate::query::RangeQuery;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::{MongoCursor, MongoStore};

/// Result alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store-level failures
///
/// These never reach the UI layer directly: each component maps them onto
/// the dashboard error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Server unreachable, pool cleared, or network failure
    Unavailable(String),

    /// Operation ran past its time budget
    Timeout(String),

    /// Server rejected the query
    Query(String),

    /// Cursor iteration failed after the cursor was opened
    Cursor(String),
}

impl StoreError {
    /// Whether the store itself could not be reached
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    pub fn message(&self) -> &str {
        match self {
            StoreError::Unavailable(msg)
            | StoreError::Timeout(msg)
            | StoreError::Query(msg)
            | StoreError::Cursor(msg) => msg,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            StoreError::Timeout(msg) => write!(f, "store operation timed out: {msg}"),
            StoreError::Query(msg) => write!(f, "query rejected: {msg}"),
            StoreError::Cursor(msg) => write!(f, "cursor failed: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Batched cursor over query results
///
/// Implementations release server-side state when `close` is called or, if
/// the caller never gets that far, when the cursor is dropped.
#[async_trait]
pub trait RecordCursor: Send {
    /// Fetch the next batch of documents
    ///
    /// # Returns
    /// * `StoreResult<Option<Vec<Document>>>` - Next batch, or None once exhausted
    async fn next_batch(&mut self) -> StoreResult<Option<Vec<Document>>>;

    /// Release the cursor. Calling it more than once is harmless.
    async fn close(&mut self);

    /// Number of documents handed out so far
    fn fetched(&self) -> u64;
}

/// Read-only access to the telemetry collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Count documents matching `query`, giving up after `budget`
    ///
    /// # Arguments
    /// * `query` - Range query to count
    /// * `budget` - Server-side time limit for the count
    ///
    /// # Returns
    /// * `StoreResult<u64>` - Number of matches, or `StoreError::Timeout`
    async fn count(&self, query: &RangeQuery, budget: Duration) -> StoreResult<u64>;

    /// Open a cursor over documents matching `query`
    ///
    /// # Arguments
    /// * `query` - Range query to run
    /// * `spec` - Sort, paging, hint and cursor options
    ///
    /// # Returns
    /// * `StoreResult<Box<dyn RecordCursor>>` - Open cursor or error
    async fn find(&self, query: &RangeQuery, spec: &FindSpec)
    -> StoreResult<Box<dyn RecordCursor>>;
}

/// Cursor options for a find
#[derive(Debug, Clone, PartialEq)]
pub struct FindSpec {
    /// Sort keys, applied in order
    pub sort: Document,
    pub skip: u64,
    /// Maximum number of documents; None for the whole result set
    pub limit: Option<u64>,
    /// Documents fetched per round trip and handed out per `next_batch`
    pub batch_size: u32,
    /// Index to use
    pub hint: Option<Document>,
    /// Fields to return; None for all
    pub projection: Option<Vec<String>>,
    /// Keep the server from reaping an idle cursor
    pub no_cursor_timeout: bool,
    /// Comment attached to the server operation
    pub comment: Option<String>,
}

impl FindSpec {
    /// Stable page window: sort by timestamp, then identity
    ///
    /// # Arguments
    /// * `query` - Query whose timestamp field drives the sort
    /// * `identity_field` - Tie-break field
    /// * `skip` - Offset of the first record
    /// * `limit` - Page size
    pub fn page(query: &RangeQuery, identity_field: &str, skip: u64, limit: u64) -> Self {
        Self {
            sort: stable_sort(query, identity_field),
            skip,
            limit: Some(limit),
            batch_size: u32::try_from(limit).unwrap_or(u32::MAX),
            hint: Some(stable_sort(query, identity_field)),
            projection: None,
            no_cursor_timeout: false,
            comment: Some(operation_comment("page")),
        }
    }

    /// Full drain for export: no limit, no cursor timeout
    ///
    /// # Arguments
    /// * `query` - Query whose timestamp field drives the sort
    /// * `identity_field` - Tie-break field, always projected
    /// * `batch_size` - Driver fetch size
    /// * `projection` - Optional subset of fields
    pub fn export(
        query: &RangeQuery,
        identity_field: &str,
        batch_size: u32,
        projection: Option<Vec<String>>,
    ) -> Self {
        let projection = projection.map(|mut fields| {
            if !fields.iter().any(|f| f == identity_field) {
                fields.insert(0, identity_field.to_string());
            }
            fields
        });

        Self {
            sort: stable_sort(query, identity_field),
            skip: 0,
            limit: None,
            batch_size: batch_size.max(1),
            hint: Some(stable_sort(query, identity_field)),
            projection,
            no_cursor_timeout: true,
            comment: Some(operation_comment("export")),
        }
    }

    /// Drop the index hint (for deployments without the range index)
    pub fn without_hint(mut self) -> Self {
        self.hint = None;
        self
    }

    /// Drop both sort and hint, letting the server return documents in
    /// whatever order it scans them
    ///
    /// Without the range index a sorted full drain would make the server
    /// buffer and sort the whole result before returning the first batch.
    pub fn unordered(mut self) -> Self {
        self.sort = Document::new();
        self.hint = None;
        self
    }

    /// Whether a sort is requested
    pub fn is_ordered(&self) -> bool {
        !self.sort.is_empty()
    }

    /// Projection rendered as a MongoDB projection document
    pub fn projection_document(&self) -> Option<Document> {
        self.projection.as_ref().map(|fields| {
            let mut projection = Document::new();
            for field in fields {
                projection.insert(field.as_str(), 1);
            }
            projection
        })
    }
}

fn stable_sort(query: &RangeQuery, identity_field: &str) -> Document {
    range_index_keys(query.timestamp_field(), identity_field)
}

/// Keys of the index that serves range pages: `{<timestamp>: 1, <identity>: 1}`
///
/// The sort of every page walks this index, so no blocking sort stage is
/// needed however wide the range.
pub fn range_index_keys(timestamp_field: &str, identity_field: &str) -> Document {
    let mut keys = Document::new();
    keys.insert(timestamp_field, 1);
    keys.insert(identity_field, 1);
    keys
}

/// Unique comment for a server operation, so it can be found in `$currentOp`
///
/// Format: `navydash-<kind>-<host>-<uuid>`
pub fn operation_comment(kind: &str) -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    format!("navydash-{kind}-{host}-{}", Uuid::new_v4())
}
