//! Genset telemetry dashboard core
//!
//! Range queries over a timestamp-indexed MongoDB collection, with bounded
//! counting, deterministic paging and streaming CSV export.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and interactive pager
//! - `config`: Configuration management
//! - `connection`: Process-wide pooled MongoDB connection
//! - `error`: Error types and handling
//! - `executor`: Count, fetch, pagination, browse and export
//! - `formatter`: Output formatting and display
//! - `query`: Input validation, query construction and records
//! - `store`: Document store abstraction with MongoDB and in-memory backends
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use navydash::{BrowseSession, Config, ConnectionManager, query::{Mode, QueryBuilder}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let manager = ConnectionManager::shared(&config.connection);
//!     let store = Arc::new(manager.store(&config.query).await?);
//!
//!     let start = chrono::NaiveDate::from_ymd_opt(2025, 8, 28).unwrap().and_hms_opt(0, 0, 0).unwrap();
//!     let end = start + chrono::Duration::hours(6);
//!     let query = QueryBuilder::from_config(&config.query).build(start, end, Mode::Check);
//!
//!     let mut session = BrowseSession::from_config(store, &config);
//!     let page = session.submit(query).await?;
//!     println!("{} records over {} pages", page.total_records, page.total_pages);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod formatter;
pub mod query;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use connection::ConnectionManager;
pub use error::{DashboardError, Result};
pub use executor::{BrowseSession, PageResponse, StreamingExporter};
pub use formatter::Formatter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}
