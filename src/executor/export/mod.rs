//! Streaming CSV export
//!
//! Components:
//!
//! 1. **CsvBuffer**: encodes records against a header fixed by the first record
//! 2. **ProgressTracker**: optional progress bar or spinner
//! 3. **StreamingExporter**: drains a store cursor into the buffer in batches
//! 4. **write_artifact**: names and writes the resulting file
//!
//! # Example
//!
//! ```no_run
//! # async fn run(store: std::sync::Arc<dyn navydash::store::DocumentStore>,
//! #              query: navydash::query::RangeQuery) -> navydash::error::Result<()> {
//! use navydash::executor::export::{ExportOptions, StreamingExporter};
//!
//! let exporter = StreamingExporter::new(store, ExportOptions::default());
//! let outcome = exporter.export(&query).await?;
//! println!("{} records processed", outcome.records);
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod coordinator;
pub mod csv;
pub mod progress;

use std::time::Duration;

use crate::query::Mode;

pub use artifact::{export_filename, write_artifact};
pub use coordinator::{ExportOptions, StreamingExporter};
pub use csv::CsvBuffer;
pub use progress::ProgressTracker;

/// Whether every matching record made it into the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    Complete,
    /// The store failed mid-stream; the payload holds the rows read before it
    Partial { error: String },
}

/// Result of an export run
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    /// CSV bytes, header included
    pub payload: Vec<u8>,
    /// Data rows in the payload
    pub records: u64,
    /// Mode of the exported query, used in the artifact name
    pub mode: Mode,
    pub status: ExportStatus,
    pub elapsed: Duration,
}

impl ExportOutcome {
    /// True when a complete export matched nothing
    pub fn is_empty(&self) -> bool {
        self.records == 0 && self.status == ExportStatus::Complete
    }
}
