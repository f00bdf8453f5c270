//! BSON value conversion utilities
//!
//! This module provides BSON conversion with interchangeable strategies:
//! - Plain text conversion for CSV cells
//! - Cell conversion for page tables (bounded width, nested values summarised)
//! - JSON value conversion for the JSON page output
//!
//! # Design
//!
//! Every strategy implements the common `BsonConverter` trait. The string
//! strategies share the per-type dispatch in `BsonStringConverter`.

mod converter;
mod helpers;
mod strategies;

pub use converter::BsonConverter;
pub use helpers::{datetime_to_iso_string, truncate_string};
pub use strategies::{CellConverter, JsonConverter, PlainTextConverter};
