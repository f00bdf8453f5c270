//! Error handling for the dashboard core.
//!
//! This module provides:
//! - The user-facing error taxonomy (`ValidationError`, `ConnectionError`,
//!   count timeouts, `ExportError`, ...) wrapped by [`DashboardError`]
//! - Structured extraction of MongoDB driver error details, used by the store
//!   binding to classify failures before they reach any caller
//!
//! # Example
//!
//! ```rust
//! use navydash::error::{DashboardError, Result, ValidationError};
//!
//! fn check(start: u32, end: u32) -> Result<()> {
//!     if end <= start {
//!         return Err(ValidationError::EndNotAfterStart.into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(matches!(check(2, 1), Err(DashboardError::Validation(_))));
//! ```

pub mod kinds;
pub mod store;

// Re-export commonly used types
pub use kinds::{
    ConfigError, ConnectionError, DashboardError, ExportError, PaginationError, Result,
    ValidationError,
};
pub use store::{ErrorInfo, extract_error_info};
