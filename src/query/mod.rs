//! Query construction for the telemetry collection
//!
//! This module turns user input into store queries:
//! - `validation`: combine date/time inputs and reject inverted windows
//! - `builder`: build the canonical [`RangeQuery`] for a mode
//! - `record`: the caller-facing record type with a string identity

pub mod builder;
pub mod record;
pub mod validation;

pub use builder::{Mode, QueryBuilder, RangeQuery, StatusBand};
pub use record::{Record, render_identity};
pub use validation::{DateTimeRange, isoformat, parse_date, parse_time, validate_range};
