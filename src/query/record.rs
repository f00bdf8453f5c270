//! Telemetry records as handed to callers.

use mongodb::bson::{Bson, Document};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::formatter::bson_utils::{BsonConverter, JsonConverter, PlainTextConverter};

/// One telemetry sample whose identity has been rendered as a string
///
/// Field order is the order the store returned. The store's native identity
/// type never appears inside a `Record`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record(Document);

impl Record {
    /// Wrap a store document, stringifying its identity field in place
    pub fn from_document(mut doc: Document, identity_field: &str) -> Self {
        if let Some(identity) = doc.get(identity_field) {
            if !matches!(identity, Bson::String(_)) {
                let rendered = render_identity(identity);
                doc.insert(identity_field, Bson::String(rendered));
            }
        }
        Self(doc)
    }

    pub fn get(&self, field: &str) -> Option<&Bson> {
        self.0.get(field)
    }

    /// String field accessor
    pub fn get_str(&self, field: &str) -> Option<&str> {
        match self.0.get(field) {
            Some(Bson::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Field names in store order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_document(&self) -> &Document {
        &self.0
    }

    pub fn into_document(self) -> Document {
        self.0
    }

    /// Plain JSON mapping of the record
    pub fn to_plain_json(&self) -> JsonValue {
        JsonConverter::simplified().convert_document(&self.0)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_plain_json().serialize(serializer)
    }
}

/// String form of a native identity value
///
/// ObjectIds render as their 24-character hex form.
pub fn render_identity(value: &Bson) -> String {
    match value {
        Bson::ObjectId(oid) => oid.to_hex(),
        other => PlainTextConverter::new().convert(other),
    }
}
