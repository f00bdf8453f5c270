//! Strategy implementations for BSON conversion
//!
//! - PlainTextConverter: CSV cells
//! - CellConverter: bounded table cells
//! - JsonConverter: JSON values for page output

use mongodb::bson::{Binary, Bson, DateTime, Decimal128, Document, oid::ObjectId};
use serde_json::Value as JsonValue;

use super::converter::{BsonConverter, BsonJsonConverter, BsonStringConverter};
use super::helpers::*;

/// Plain text converter for export cells
///
/// Strings are emitted verbatim, integers as decimal text, doubles in
/// Python `repr` form (`220.0`, `1e+16`), null as an empty cell, ObjectIds
/// as hex and datetimes as RFC 3339. Arrays and documents are emitted as
/// compact JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextConverter;

impl PlainTextConverter {
    /// Create a new plain text converter
    pub fn new() -> Self {
        Self
    }

    fn nested_json(&self, value: &Bson) -> String {
        let json = JsonConverter::simplified().convert(value);
        serde_json::to_string(&json).unwrap_or_default()
    }
}

impl BsonConverter for PlainTextConverter {
    type Output = String;

    fn convert(&self, value: &Bson) -> String {
        self.convert_to_string(value)
    }
}

impl BsonStringConverter for PlainTextConverter {
    fn format_double(&self, f: f64) -> String {
        format_double_repr(f)
    }

    fn format_object_id(&self, oid: &ObjectId) -> String {
        oid.to_hex()
    }

    fn format_datetime(&self, dt: &DateTime) -> String {
        datetime_to_iso_string(dt)
    }

    fn format_array(&self, arr: &[Bson]) -> String {
        self.nested_json(&Bson::Array(arr.to_vec()))
    }

    fn format_document(&self, doc: &Document) -> String {
        self.nested_json(&Bson::Document(doc.clone()))
    }

    fn format_binary(&self, bin: &Binary) -> String {
        binary_to_base64(bin)
    }
}

/// Compact converter for table cells
///
/// Nested values collapse to a size summary and long text is cut to
/// `max_width` characters.
#[derive(Debug, Clone, Copy)]
pub struct CellConverter {
    max_width: usize,
}

impl CellConverter {
    /// Create a cell converter
    ///
    /// # Arguments
    /// * `max_width` - Maximum characters per cell
    pub fn new(max_width: usize) -> Self {
        Self {
            max_width: max_width.max(4),
        }
    }
}

impl Default for CellConverter {
    fn default() -> Self {
        Self::new(40)
    }
}

impl BsonConverter for CellConverter {
    type Output = String;

    fn convert(&self, value: &Bson) -> String {
        truncate_string(&self.convert_to_string(value), self.max_width)
    }
}

impl BsonStringConverter for CellConverter {
    fn format_null(&self) -> String {
        String::from("null")
    }

    fn format_double(&self, f: f64) -> String {
        format_double_smart(f)
    }

    fn format_object_id(&self, oid: &ObjectId) -> String {
        oid.to_hex()
    }

    fn format_datetime(&self, dt: &DateTime) -> String {
        datetime_to_iso_string(dt)
    }

    fn format_array(&self, arr: &[Bson]) -> String {
        format!("[Array({})]", arr.len())
    }

    fn format_document(&self, doc: &Document) -> String {
        format!("{{Object({})}}", doc.len())
    }

    fn format_binary(&self, bin: &Binary) -> String {
        format!("Binary({})", truncate_string(&binary_to_hex(bin), 16))
    }
}

/// JSON value converter
///
/// ObjectIds always become hex strings. In simplified mode decimals are
/// parsed into JSON numbers and binary data becomes base64; otherwise both
/// keep extended JSON wrappers.
#[derive(Debug, Clone, Copy)]
pub struct JsonConverter {
    simplify: bool,
}

impl JsonConverter {
    /// Create a new JSON converter
    ///
    /// # Arguments
    /// * `simplify` - If true, convert BSON types to simple JSON types
    pub fn new(simplify: bool) -> Self {
        Self { simplify }
    }

    /// Create a simplified JSON converter
    pub fn simplified() -> Self {
        Self::new(true)
    }
}

impl Default for JsonConverter {
    fn default() -> Self {
        Self::simplified()
    }
}

impl BsonConverter for JsonConverter {
    type Output = JsonValue;

    fn convert(&self, value: &Bson) -> JsonValue {
        self.convert_to_json(value)
    }
}

impl BsonJsonConverter for JsonConverter {
    fn convert_datetime(&self, dt: &DateTime) -> JsonValue {
        JsonValue::String(datetime_to_iso_string(dt))
    }

    fn convert_decimal128(&self, d: &Decimal128) -> JsonValue {
        let s = d.to_string();
        if self.simplify {
            if let Some(number) = s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                return JsonValue::Number(number);
            }
            return JsonValue::String(s);
        }
        serde_json::json!({ "$numberDecimal": s })
    }

    fn convert_binary(&self, bin: &Binary) -> JsonValue {
        if self.simplify {
            JsonValue::String(binary_to_base64(bin))
        } else {
            serde_json::json!({
                "$binary": {
                    "base64": binary_to_base64(bin),
                    "subType": format!("{:02x}", u8::from(bin.subtype)),
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_plain_text_scalars() {
        let converter = PlainTextConverter::new();
        assert_eq!(converter.convert(&Bson::String("a,b".into())), "a,b");
        assert_eq!(converter.convert(&Bson::Int32(42)), "42");
        assert_eq!(converter.convert(&Bson::Int64(-7)), "-7");
        assert_eq!(converter.convert(&Bson::Double(3.5)), "3.5");
        assert_eq!(converter.convert(&Bson::Double(220.0)), "220.0");
        assert_eq!(converter.convert(&Bson::Double(1e16)), "1e+16");
        assert_eq!(converter.convert(&Bson::Boolean(true)), "true");
        assert_eq!(converter.convert(&Bson::Null), "");
        assert_eq!(converter.convert_optional(None), "");
    }

    #[test]
    fn test_plain_text_object_id_is_hex() {
        let oid = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        let converter = PlainTextConverter::new();
        assert_eq!(
            converter.convert(&Bson::ObjectId(oid)),
            "507f1f77bcf86cd799439011"
        );
    }

    #[test]
    fn test_plain_text_nested_values_are_json() {
        let converter = PlainTextConverter::new();
        let nested = Bson::Document(doc! { "a": 1, "b": [1, 2] });
        assert_eq!(converter.convert(&nested), r#"{"a":1,"b":[1,2]}"#);
        let arr = Bson::Array(vec![Bson::String("x".into()), Bson::Null]);
        assert_eq!(converter.convert(&arr), r#"["x",null]"#);
    }

    #[test]
    fn test_cell_converter_summarises_and_truncates() {
        let converter = CellConverter::new(10);
        assert_eq!(
            converter.convert(&Bson::Array(vec![Bson::Int32(1), Bson::Int32(2)])),
            "[Array(2)]"
        );
        assert_eq!(converter.convert(&Bson::Document(doc! { "a": 1 })), "{Object(1)}");
        assert_eq!(
            converter.convert(&Bson::String("abcdefghijklmnop".into())),
            "abcdefg..."
        );
        assert_eq!(converter.convert(&Bson::Double(12.0)), "12");
        assert_eq!(converter.convert(&Bson::Null), "null");
    }

    #[test]
    fn test_json_converter() {
        let oid = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        let converter = JsonConverter::simplified();
        let json = converter.convert_document(&doc! {
            "_id": oid,
            "power": 12.5,
            "tags": ["a"],
            "missing": Bson::Null,
        });
        assert_eq!(json["_id"], "507f1f77bcf86cd799439011");
        assert_eq!(json["power"], 12.5);
        assert_eq!(json["tags"][0], "a");
        assert!(json["missing"].is_null());
    }

    #[test]
    fn test_json_converter_datetime() {
        let dt = DateTime::from_millis(0);
        let json = JsonConverter::simplified().convert(&Bson::DateTime(dt));
        assert_eq!(json, "1970-01-01T00:00:00Z");
    }
}
