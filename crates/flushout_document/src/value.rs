//! Field values stored inside document entries.

use crate::error::{DocumentError, DocumentResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A property set: field name to value.
///
/// Used both as the record held by an entry and as the partial
/// property set carried by a command.
pub type Props = BTreeMap<String, Value>;

/// A dynamic field value.
///
/// Floats are intentionally not representable; timestamps and other
/// numeric metadata are carried as integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Text string.
    Text(String),
    /// List of values.
    List(Vec<Value>),
    /// Nested mapping.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as a list, if it is one.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get this value as a mapping, if it is one.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Builds a [`Props`] from `(field, value)` pairs.
pub fn props<K, V, I>(pairs: I) -> Props
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Converts a serializable struct into a property set.
///
/// The value is passed through CBOR, so anything that serializes as a
/// string-keyed map works. Fields serialized as floats are rejected.
pub fn to_props<T: Serialize>(value: &T) -> DocumentResult<Props> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| DocumentError::conversion(e.to_string()))?;
    ciborium::from_reader(bytes.as_slice()).map_err(|e| DocumentError::conversion(e.to_string()))
}

/// Converts a property set into a typed struct.
pub fn from_props<T: DeserializeOwned>(props: &Props) -> DocumentResult<T> {
    let mut bytes = Vec::new();
    ciborium::into_writer(props, &mut bytes)
        .map_err(|e| DocumentError::conversion(e.to_string()))?;
    ciborium::from_reader(bytes.as_slice()).map_err(|e| DocumentError::conversion(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        title: String,
        pinned: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order: Option<i64>,
    }

    #[test]
    fn value_accessors() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Integer(42).as_integer(), Some(42));
        assert_eq!(Value::Text("42".into()).as_integer(), None);
        assert_eq!(Value::from("hi").as_text(), Some("hi"));
        assert_eq!(Value::from(vec![1i64, 2]).as_list().map(<[Value]>::len), Some(2));
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(7i64)), Value::Integer(7));
    }

    #[test]
    fn typed_props_conversion() {
        let note = Note {
            title: "groceries".into(),
            pinned: true,
            order: None,
        };

        let converted = to_props(&note).unwrap();
        assert_eq!(converted.get("title"), Some(&Value::from("groceries")));
        assert_eq!(converted.get("pinned"), Some(&Value::Bool(true)));
        assert!(!converted.contains_key("order"));

        let back: Note = from_props(&converted).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn from_props_reports_missing_fields() {
        let partial = props([("pinned", true)]);
        let result: DocumentResult<Note> = from_props(&partial);
        assert!(matches!(result, Err(DocumentError::Conversion { .. })));
    }

    #[test]
    fn json_shape_is_plain() {
        let record = props([("text", Value::from("buy milk")), ("createdAt", Value::from(17i64))]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"createdAt":17,"text":"buy milk"}"#);
    }
}
