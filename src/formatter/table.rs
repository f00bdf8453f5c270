//! Table rendering for pages of telemetry records using tabled
//!
//! Columns follow the field order of the first record, with fields that
//! only appear in later records appended in the order they are met.

use tabled::{
    Table,
    builder::Builder,
    settings::{Alignment, Color, Modify, Style, object::{Columns, Rows}, width::Width},
};

use super::bson_utils::{BsonConverter, CellConverter};
use crate::query::Record;

/// Maximum width for a single column (characters)
const DEFAULT_MAX_COLUMN_WIDTH: usize = 40;

/// Table formatter for record pages
pub struct TableFormatter {
    /// Maximum column width
    max_column_width: usize,

    /// Table style
    style: TableStyle,

    /// Enable colored header
    use_colors: bool,
}

/// Available table styles
#[derive(Debug, Clone, Copy)]
pub enum TableStyle {
    /// Modern style with box-drawing borders
    Modern,
    /// ASCII style with basic characters
    Ascii,
    /// Psql style
    Psql,
}

impl TableFormatter {
    /// Create a new table formatter
    ///
    /// # Arguments
    /// * `use_colors` - Enable colored header row
    pub fn new(use_colors: bool) -> Self {
        Self {
            max_column_width: DEFAULT_MAX_COLUMN_WIDTH,
            style: TableStyle::Modern,
            use_colors,
        }
    }

    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_max_column_width(mut self, width: usize) -> Self {
        self.max_column_width = width.max(4);
        self
    }

    /// Format records as a table
    ///
    /// # Arguments
    /// * `records` - Records to format
    ///
    /// # Returns
    /// * `String` - Table text, or a placeholder for an empty page
    pub fn format(&self, records: &[Record]) -> String {
        if records.is_empty() {
            return "(empty page)".to_string();
        }

        let fields = column_names(records);
        if fields.is_empty() {
            return "(no fields found)".to_string();
        }

        let converter = CellConverter::new(self.max_column_width);
        let mut builder = Builder::default();
        builder.push_record(fields.clone());
        for record in records {
            let row: Vec<String> = fields
                .iter()
                .map(|field| match record.get(field) {
                    Some(value) => converter.convert(value),
                    None => String::new(),
                })
                .collect();
            builder.push_record(row);
        }

        let mut table = builder.build();
        self.apply_style(&mut table);

        for i in 0..fields.len() {
            table.with(Modify::new(Columns::new(i..=i)).with(Width::wrap(self.max_column_width)));
        }
        table.with(Modify::new(Rows::first()).with(Alignment::center()));

        if self.use_colors {
            table.modify(Rows::first(), Color::FG_CYAN | Color::BOLD);
        }

        table.to_string()
    }

    fn apply_style(&self, table: &mut Table) {
        match self.style {
            TableStyle::Modern => table.with(Style::modern()),
            TableStyle::Ascii => table.with(Style::ascii()),
            TableStyle::Psql => table.with(Style::psql()),
        };
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Column names: first record's order, then unseen fields as they appear
pub fn column_names(records: &[Record]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !fields.iter().any(|f| f == key) {
                fields.push(key.clone());
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    fn records() -> Vec<Record> {
        vec![
            Record::from_document(
                doc! { "_id": "a1", "timestamp": "2025-08-28T10:00:00", "Genset_Run_SS": 1 },
                "_id",
            ),
            Record::from_document(
                doc! { "_id": "a2", "timestamp": "2025-08-28T10:00:01", "extra": true },
                "_id",
            ),
        ]
    }

    #[test]
    fn test_column_order_follows_first_record() {
        assert_eq!(
            column_names(&records()),
            vec!["_id", "timestamp", "Genset_Run_SS", "extra"]
        );
    }

    #[test]
    fn test_format_contains_values() {
        let output = TableFormatter::new(false)
            .with_style(TableStyle::Ascii)
            .format(&records());
        assert!(output.contains("Genset_Run_SS"));
        assert!(output.contains("a2"));
        assert!(output.contains("true"));
        assert!(output.contains("2025-08-28T10:00:01"));
    }

    #[test]
    fn test_empty_page() {
        assert_eq!(TableFormatter::default().format(&[]), "(empty page)");
    }
}
