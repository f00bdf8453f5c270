//! Query execution over the telemetry store
//!
//! This module holds the components that run range queries:
//! - Count estimator with a bounded time budget
//! - Paged fetcher returning stable, sorted windows
//! - Pagination controller owning the page state machine
//! - Browse session tying the three together for interactive use
//! - Streaming CSV exporter for full result sets
//!
//! Every store failure is converted into a [`crate::error::DashboardError`]
//! at the component that observed it.

pub mod browse;
pub mod count;
pub mod export;
pub mod fetch;
pub mod pagination;

pub use browse::{BrowseSession, CountStatus, PageResponse};
pub use count::CountEstimator;
pub use export::{
    ExportOptions, ExportOutcome, ExportStatus, StreamingExporter, export_filename,
    write_artifact,
};
pub use fetch::{FetchedPage, PagedFetcher};
pub use pagination::{PageMove, PageState, PaginationController, Phase, QueryTicket};
