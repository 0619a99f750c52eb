//! FieldMap - the key-value body of a document.

use std::collections::HashMap;
use super::Value;

/// A map of field names to values.
pub type FieldMap = HashMap<String, Value>;

/// Reserved key for the document identifier. Never persisted as a field.
pub const ID_FIELD: &str = "id";

/// Build a `FieldMap` from (key, value) pairs.
///
/// ```
/// use docstore::{fields, Value};
///
/// let body = fields([("content", Value::from("hola")), ("turn", Value::from(1))]);
/// assert_eq!(body.len(), 2);
/// ```
pub fn fields<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> FieldMap
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Build a `Value::Map` from (key, value) pairs.
pub fn map_value<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Value
where
    K: Into<String>,
    V: Into<Value>,
{
    Value::Map(fields(pairs))
}
