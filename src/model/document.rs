//! Document in a named collection.

use serde::{Deserialize, Serialize};

use super::{FieldMap, FromValue, Value, ID_FIELD};
use crate::{Error, Result};

/// An identifier-addressed field map.
///
/// `id` is filled in by the store on every read. On write it is ignored:
/// the identifier is addressing, never payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Option<String>,
    pub fields: FieldMap,
}

impl Document {
    pub fn new(fields: FieldMap) -> Self {
        Self { id: None, fields }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Lift an embedded map (e.g. an element of a list field) into a
    /// document so it can be decoded with `FromDocument`. An `id` key inside
    /// the map becomes the document id.
    pub fn from_map(mut fields: FieldMap) -> Self {
        let id = fields.remove(ID_FIELD).and_then(|v| v.as_str().map(str::to_owned));
        Self { id, fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Read a required field. Missing or null fields are an error.
    pub fn require<T: FromValue>(&self, key: &str) -> Result<T> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Err(Error::MissingField(key.to_string())),
            Some(v) => T::from_value(v),
        }
    }

    /// Read an optional field. Missing and null both decode to `None`.
    pub fn optional<T: FromValue>(&self, key: &str) -> Result<Option<T>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => T::from_value(v).map(Some),
        }
    }

    /// Read a list of embedded records; a missing list decodes to empty.
    pub fn records<T: FromDocument>(&self, key: &str) -> Result<Vec<T>> {
        let Some(items) = self.optional::<Vec<Value>>(key)? else {
            return Ok(Vec::new());
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::Map(m) => T::from_document(Document::from_map(m)),
                other => Err(Error::TypeError {
                    expected: "Map".into(),
                    got: other.type_name().into(),
                }),
            })
            .collect()
    }
}

// ============================================================================
// Typed schemas
// ============================================================================

/// Decode a typed record out of a document read from the store.
pub trait FromDocument: Sized + Send + 'static {
    fn from_document(doc: Document) -> Result<Self>;
}

impl FromDocument for Document {
    fn from_document(doc: Document) -> Result<Self> {
        Ok(doc)
    }
}

/// A typed record bound to one collection.
///
/// `to_fields` must not emit an `id` key; the store strips it anyway.
pub trait Schema: FromDocument {
    const COLLECTION: &'static str;

    fn to_fields(&self) -> FieldMap;
}

/// Encode a list of records as a list of maps, for embedding.
pub fn embed<T, F>(items: &[T], encode: F) -> Value
where
    F: Fn(&T) -> FieldMap,
{
    Value::List(items.iter().map(|i| Value::Map(encode(i))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fields;

    #[test]
    fn test_require_missing_field() {
        let doc = Document::new(fields([("a", 1)]));
        assert!(matches!(doc.require::<String>("b"), Err(Error::MissingField(k)) if k == "b"));
        assert_eq!(doc.require::<i64>("a").unwrap(), 1);
    }

    #[test]
    fn test_optional_null_is_none() {
        let doc = Document::new(fields([("a", Value::Null)]));
        assert_eq!(doc.optional::<String>("a").unwrap(), None);
        assert_eq!(doc.optional::<String>("zzz").unwrap(), None);
    }

    #[test]
    fn test_from_map_lifts_id() {
        let doc = Document::from_map(fields([("id", "x1"), ("name", "n")]));
        assert_eq!(doc.id.as_deref(), Some("x1"));
        assert!(doc.get("id").is_none());
    }
}
