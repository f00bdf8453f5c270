//! In-memory CSV encoding of exported records
//!
//! The header is fixed by the first record written. Later records are laid
//! out against that header: missing fields become empty cells, and extra
//! fields are either dropped or rejected depending on the schema policy.

use csv::{Terminator, Writer, WriterBuilder};
use tracing::debug;

use crate::config::SchemaPolicy;
use crate::error::ExportError;
use crate::formatter::bson_utils::{BsonConverter, PlainTextConverter};
use crate::query::Record;

/// Accumulating CSV byte sink
pub struct CsvBuffer {
    writer: Writer<Vec<u8>>,
    /// Column headers, empty until the first record
    headers: Vec<String>,
    schema_policy: SchemaPolicy,
    /// Rows written so far
    written: u64,
    converter: PlainTextConverter,
}

impl CsvBuffer {
    /// Create an empty buffer
    ///
    /// Rows end with CRLF.
    pub fn new(schema_policy: SchemaPolicy) -> Self {
        let writer = WriterBuilder::new()
            .terminator(Terminator::CRLF)
            .from_writer(Vec::new());
        Self {
            writer,
            headers: Vec::new(),
            schema_policy,
            written: 0,
            converter: PlainTextConverter::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Write a batch of records
    ///
    /// # Arguments
    /// * `records` - Records to append, in order
    ///
    /// # Returns
    /// * `Result<usize, ExportError>` - Number of rows written
    pub fn write_batch(&mut self, records: &[Record]) -> Result<usize, ExportError> {
        if records.is_empty() {
            return Ok(0);
        }

        if self.headers.is_empty() {
            self.headers = records[0].keys().cloned().collect();
            self.writer
                .write_record(&self.headers)
                .map_err(|e| ExportError::Encoding(e.to_string()))?;
            debug!("CSV header fixed with {} fields", self.headers.len());
        }

        for record in records {
            if self.schema_policy == SchemaPolicy::Strict {
                let extra: Vec<String> = record
                    .keys()
                    .filter(|key| !self.headers.contains(key))
                    .cloned()
                    .collect();
                if !extra.is_empty() {
                    return Err(ExportError::SchemaMismatch {
                        record: self.written + 1,
                        fields: extra,
                    });
                }
            }

            let row: Vec<String> = self
                .headers
                .iter()
                .map(|field| self.converter.convert_optional(record.get(field)))
                .collect();
            self.writer
                .write_record(&row)
                .map_err(|e| ExportError::Encoding(e.to_string()))?;
            self.written += 1;
        }

        self.writer
            .flush()
            .map_err(|e| ExportError::Encoding(e.to_string()))?;
        Ok(records.len())
    }

    /// Finish encoding and return the CSV bytes
    pub fn into_payload(self) -> Result<Vec<u8>, ExportError> {
        self.writer
            .into_inner()
            .map_err(|e| ExportError::Encoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};

    fn record(doc: mongodb::bson::Document) -> Record {
        Record::from_document(doc, "_id")
    }

    #[test]
    fn test_header_from_first_record_in_order() {
        let mut buffer = CsvBuffer::new(SchemaPolicy::DropExtra);
        buffer
            .write_batch(&[record(doc! { "timestamp": "t1", "_id": "a", "value": 1 })])
            .unwrap();
        let payload = String::from_utf8(buffer.into_payload().unwrap()).unwrap();
        assert_eq!(payload, "timestamp,_id,value\r\nt1,a,1\r\n");
    }

    #[test]
    fn test_drop_extra_and_blank_missing() {
        let mut buffer = CsvBuffer::new(SchemaPolicy::DropExtra);
        buffer
            .write_batch(&[
                record(doc! { "_id": "a", "x": 1, "y": 2 }),
                record(doc! { "_id": "b", "y": 3, "z": 4 }),
            ])
            .unwrap();
        let payload = String::from_utf8(buffer.into_payload().unwrap()).unwrap();
        assert_eq!(payload, "_id,x,y\r\na,1,2\r\nb,,3\r\n");
    }

    #[test]
    fn test_strict_rejects_extra_fields() {
        let mut buffer = CsvBuffer::new(SchemaPolicy::Strict);
        let err = buffer
            .write_batch(&[
                record(doc! { "_id": "a", "x": 1 }),
                record(doc! { "_id": "b", "x": 2, "z": 4 }),
            ])
            .unwrap_err();
        match err {
            ExportError::SchemaMismatch { record, fields } => {
                assert_eq!(record, 2);
                assert_eq!(fields, vec!["z".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_identity_and_quoting() {
        let oid = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        let mut buffer = CsvBuffer::new(SchemaPolicy::DropExtra);
        buffer
            .write_batch(&[record(doc! { "_id": oid, "note": "a, \"b\"" })])
            .unwrap();
        let payload = String::from_utf8(buffer.into_payload().unwrap()).unwrap();
        assert_eq!(
            payload,
            "_id,note\r\n507f1f77bcf86cd799439011,\"a, \"\"b\"\"\"\r\n"
        );
    }

    #[test]
    fn test_empty_buffer_has_no_header() {
        let mut buffer = CsvBuffer::new(SchemaPolicy::DropExtra);
        assert_eq!(buffer.write_batch(&[]).unwrap(), 0);
        assert!(buffer.into_payload().unwrap().is_empty());
    }
}
