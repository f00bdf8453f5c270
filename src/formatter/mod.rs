//! Output formatting and colorization for navydash
//!
//! This module turns browse pages and export outcomes into terminal text:
//! - Table formatting for record pages
//! - JSON formatting (plain and pretty-printed)
//! - Status lines with page position, totals and fetch latency
//! - Color highlighting for status messages

pub mod bson_utils;
pub mod colorizer;
pub mod table;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::executor::{CountStatus, ExportOutcome, ExportStatus, PageResponse};

pub use colorizer::Colorizer;
pub use table::{TableFormatter, TableStyle};

/// Page output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Bordered table of the page's records
    #[default]
    Table,
    /// Single-line JSON object
    Json,
    /// Indented JSON object
    JsonPretty,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "pretty" => Ok(OutputFormat::JsonPretty),
            other => Err(format!(
                "unknown format '{}' (expected table, json or json-pretty)",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::JsonPretty => "json-pretty",
        };
        write!(f, "{}", name)
    }
}

/// Main formatter for pages and export outcomes
pub struct Formatter {
    /// Output format type
    format_type: OutputFormat,

    /// Colorizer for status lines
    colorizer: Colorizer,

    /// Table renderer
    table: TableFormatter,
}

impl Formatter {
    /// Create a new formatter
    ///
    /// # Arguments
    /// * `format_type` - Output format type
    /// * `use_colors` - Enable colored output
    ///
    /// # Returns
    /// * `Self` - New formatter instance
    pub fn new(format_type: OutputFormat, use_colors: bool) -> Self {
        Self {
            format_type,
            colorizer: Colorizer::new(use_colors),
            table: TableFormatter::new(use_colors),
        }
    }

    pub fn colorizer(&self) -> &Colorizer {
        &self.colorizer
    }

    /// Format one browse page
    ///
    /// Tables are followed by a status line; JSON output carries the same
    /// information as fields.
    pub fn format_page(&self, page: &PageResponse) -> String {
        match self.format_type {
            OutputFormat::Table => {
                let body = if page.is_empty() {
                    self.colorizer
                        .warning("No data found in the specified date range.")
                } else {
                    self.table.format(&page.records)
                };
                format!("{}\n{}", body, self.status_line(page))
            }
            OutputFormat::Json => serde_json::to_string(page)
                .unwrap_or_else(|e| self.colorizer.error(&e.to_string())),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(page)
                .unwrap_or_else(|e| self.colorizer.error(&e.to_string())),
        }
    }

    /// Page position, totals and latency, e.g. `Page 2 of 3 | 250 records | 12 ms`
    pub fn status_line(&self, page: &PageResponse) -> String {
        let position = format!(
            "Page {} of {} | {} records | {} ms",
            page.current_page + 1,
            page.total_pages,
            page.total_records,
            page.fetch_latency.as_millis()
        );
        let mut line = self.colorizer.dim(&position);
        if page.count_status == CountStatus::Unavailable {
            line.push('\n');
            line.push_str(
                &self
                    .colorizer
                    .warning("Record count unavailable (timed out); press 'r' to retry"),
            );
        }
        line
    }

    /// User-facing summary of an export run
    pub fn format_export(&self, outcome: &ExportOutcome) -> String {
        if outcome.is_empty() {
            return self
                .colorizer
                .warning("No data found in the specified date range.");
        }

        let processed = format!("{} records processed", outcome.records);
        match &outcome.status {
            ExportStatus::Complete => self.colorizer.success(&processed),
            ExportStatus::Partial { error } => format!(
                "{}\n{}",
                self.colorizer.warning(&format!("{} (partial)", processed)),
                self.colorizer.error(error)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Record;
    use mongodb::bson::doc;
    use std::time::Duration;

    fn page(records: Vec<Record>, status: CountStatus) -> PageResponse {
        PageResponse {
            total_records: records.len() as u64,
            total_pages: 1,
            current_page: 0,
            records,
            fetch_latency: Duration::from_millis(12),
            count_status: status,
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "json-pretty".parse::<OutputFormat>().unwrap(),
            OutputFormat::JsonPretty
        );
        assert!("csv".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_table_page_has_status_line() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let record = Record::from_document(doc! { "_id": "x", "Genset_Run_SS": 1 }, "_id");
        let output = formatter.format_page(&page(vec![record], CountStatus::Exact));
        assert!(output.contains("Genset_Run_SS"));
        assert!(output.ends_with("Page 1 of 1 | 1 records | 12 ms"));
    }

    #[test]
    fn test_unavailable_count_is_flagged() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_page(&page(Vec::new(), CountStatus::Unavailable));
        assert!(output.contains("No data found"));
        assert!(output.contains("Record count unavailable"));
    }

    #[test]
    fn test_json_page() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let record = Record::from_document(doc! { "_id": 7_i64 }, "_id");
        let output = formatter.format_page(&page(vec![record], CountStatus::Exact));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["records"][0]["_id"], "7");
        assert_eq!(value["fetch_latency_ms"], 12);
    }
}
