//! Core converter traits for BSON value conversion

use mongodb::bson::{Binary, Bson, DateTime, Decimal128, Document, oid::ObjectId};
use serde_json::Value as JsonValue;

/// Core trait for BSON value conversion
pub trait BsonConverter {
    /// Output type of the conversion
    type Output;

    /// Convert a BSON value to the output type
    fn convert(&self, value: &Bson) -> Self::Output;

    /// Convert an optional BSON value, with the default output for None
    ///
    /// A missing field in a CSV row renders through this as an empty cell.
    fn convert_optional(&self, value: Option<&Bson>) -> Self::Output
    where
        Self::Output: Default,
    {
        value.map(|v| self.convert(v)).unwrap_or_default()
    }

    /// Convert a BSON document
    fn convert_document(&self, doc: &Document) -> Self::Output {
        self.convert(&Bson::Document(doc.clone()))
    }
}

/// Per-type dispatch for string-based converters
///
/// Scalars shared by every string strategy have provided implementations;
/// a strategy overrides only what it renders differently.
pub trait BsonStringConverter {
    fn format_object_id(&self, oid: &ObjectId) -> String;
    fn format_datetime(&self, dt: &DateTime) -> String;
    fn format_array(&self, arr: &[Bson]) -> String;
    fn format_document(&self, doc: &Document) -> String;
    fn format_binary(&self, bin: &Binary) -> String;

    fn format_null(&self) -> String {
        String::new()
    }

    fn format_double(&self, f: f64) -> String {
        f.to_string()
    }

    fn format_decimal128(&self, d: &Decimal128) -> String {
        d.to_string()
    }

    /// Convert BSON value to string (provided implementation)
    fn convert_to_string(&self, value: &Bson) -> String {
        match value {
            Bson::String(s) => s.clone(),
            Bson::Int32(n) => n.to_string(),
            Bson::Int64(n) => n.to_string(),
            Bson::Double(f) => self.format_double(*f),
            Bson::Boolean(b) => b.to_string(),
            Bson::Null | Bson::Undefined => self.format_null(),
            Bson::ObjectId(oid) => self.format_object_id(oid),
            Bson::DateTime(dt) => self.format_datetime(dt),
            Bson::Decimal128(d) => self.format_decimal128(d),
            Bson::Array(arr) => self.format_array(arr),
            Bson::Document(doc) => self.format_document(doc),
            Bson::Binary(bin) => self.format_binary(bin),
            Bson::RegularExpression(regex) => format!("/{}/{}", regex.pattern, regex.options),
            Bson::Timestamp(ts) => format!("Timestamp({}, {})", ts.time, ts.increment),
            Bson::MinKey => String::from("MinKey"),
            Bson::MaxKey => String::from("MaxKey"),
            other => format!("{:?}", other),
        }
    }
}

/// Per-type dispatch for JSON conversion
pub trait BsonJsonConverter {
    fn convert_datetime(&self, dt: &DateTime) -> JsonValue;
    fn convert_decimal128(&self, d: &Decimal128) -> JsonValue;
    fn convert_binary(&self, bin: &Binary) -> JsonValue;

    /// Convert BSON value to JSON (provided implementation)
    fn convert_to_json(&self, value: &Bson) -> JsonValue {
        match value {
            Bson::String(s) => JsonValue::String(s.clone()),
            Bson::Int32(n) => JsonValue::Number((*n).into()),
            Bson::Int64(n) => JsonValue::Number((*n).into()),
            Bson::Double(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Bson::Boolean(b) => JsonValue::Bool(*b),
            Bson::Null | Bson::Undefined => JsonValue::Null,
            Bson::ObjectId(oid) => JsonValue::String(oid.to_hex()),
            Bson::DateTime(dt) => self.convert_datetime(dt),
            Bson::Decimal128(d) => self.convert_decimal128(d),
            Bson::Array(arr) => JsonValue::Array(arr.iter().map(|v| self.convert_to_json(v)).collect()),
            Bson::Document(doc) => {
                let map = doc
                    .iter()
                    .map(|(key, value)| (key.clone(), self.convert_to_json(value)))
                    .collect();
                JsonValue::Object(map)
            }
            Bson::Binary(bin) => self.convert_binary(bin),
            Bson::RegularExpression(regex) => {
                JsonValue::String(format!("/{}/{}", regex.pattern, regex.options))
            }
            Bson::Timestamp(ts) => {
                JsonValue::Number((i64::from(ts.time) * 1000 + i64::from(ts.increment)).into())
            }
            Bson::MinKey => JsonValue::String("MinKey".to_string()),
            Bson::MaxKey => JsonValue::String("MaxKey".to_string()),
            other => JsonValue::String(format!("{:?}", other)),
        }
    }
}
