use std::collections::BTreeMap;

use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use crate::model::Timestamp;
use crate::value::{ArrayValue, MapValue};

/// A document field value.
///
/// The set of kinds is closed; every kind has exactly one wire encoding.
#[derive(Clone, Debug, PartialEq)]
pub struct FirestoreValue {
    kind: ValueKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValueKind {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(Timestamp),
    String(String),
    Array(ArrayValue),
    Map(MapValue),
}

impl FirestoreValue {
    pub fn null() -> Self {
        Self {
            kind: ValueKind::Null,
        }
    }

    pub fn from_bool(value: bool) -> Self {
        Self {
            kind: ValueKind::Boolean(value),
        }
    }

    pub fn from_integer(value: i64) -> Self {
        Self {
            kind: ValueKind::Integer(value),
        }
    }

    pub fn from_double(value: f64) -> Self {
        Self {
            kind: ValueKind::Double(value),
        }
    }

    pub fn from_timestamp(value: Timestamp) -> Self {
        Self {
            kind: ValueKind::Timestamp(value),
        }
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self {
            kind: ValueKind::String(value.into()),
        }
    }

    pub fn from_array(values: Vec<FirestoreValue>) -> Self {
        Self {
            kind: ValueKind::Array(ArrayValue::new(values)),
        }
    }

    pub fn from_map(map: BTreeMap<String, FirestoreValue>) -> Self {
        Self {
            kind: ValueKind::Map(MapValue::new(map)),
        }
    }

    /// Builds an array or a map from keyed entries the way loosely typed
    /// callers expect: keys that are exactly `"0"`, `"1"`, ... `"n-1"` in
    /// order produce an array, anything else (including no entries at all)
    /// produces a map.
    ///
    /// Prefer [`FirestoreValue::from_array`] / [`FirestoreValue::from_map`]
    /// when the intent is known.
    pub fn from_keyed_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, FirestoreValue)>,
        K: Into<String>,
    {
        let entries: Vec<(String, FirestoreValue)> = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();

        let sequential = !entries.is_empty()
            && entries
                .iter()
                .enumerate()
                .all(|(index, (key, _))| *key == index.to_string());

        if sequential {
            Self::from_array(entries.into_iter().map(|(_, value)| value).collect())
        } else {
            Self::from_map(entries.into_iter().collect())
        }
    }

    /// Converts plain JSON. Objects become maps, arrays become arrays, and
    /// integral numbers that fit in an `i64` become integers.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::null(),
            JsonValue::Bool(boolean) => Self::from_bool(*boolean),
            JsonValue::Number(number) => match number.as_i64() {
                Some(integer) => Self::from_integer(integer),
                None => Self::from_double(number.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(string) => Self::from_string(string.as_str()),
            JsonValue::Array(values) => {
                Self::from_array(values.iter().map(Self::from_json).collect())
            }
            JsonValue::Object(object) => Self::from_map(
                object
                    .iter()
                    .map(|(key, value)| (key.clone(), Self::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Converts to plain JSON. Timestamps render as RFC 3339 strings and
    /// non-finite doubles as `null`.
    pub fn to_json(&self) -> JsonValue {
        match &self.kind {
            ValueKind::Null => JsonValue::Null,
            ValueKind::Boolean(boolean) => JsonValue::Bool(*boolean),
            ValueKind::Integer(integer) => JsonValue::Number(Number::from(*integer)),
            ValueKind::Double(double) => Number::from_f64(*double)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            ValueKind::Timestamp(timestamp) => JsonValue::String(timestamp.to_rfc3339()),
            ValueKind::String(string) => JsonValue::String(string.clone()),
            ValueKind::Array(array) => {
                JsonValue::Array(array.values().iter().map(Self::to_json).collect())
            }
            ValueKind::Map(map) => {
                let mut object = JsonMap::new();
                for (key, value) in map.fields() {
                    object.insert(key.clone(), value.to_json());
                }
                JsonValue::Object(object)
            }
        }
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut ValueKind {
        &mut self.kind
    }

    pub fn into_kind(self) -> ValueKind {
        self.kind
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            ValueKind::Boolean(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.kind {
            ValueKind::Integer(value) => Some(value),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_double(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Double(value) => Some(value),
            ValueKind::Integer(value) => Some(value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self.kind {
            ValueKind::Timestamp(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FirestoreValue]> {
        match &self.kind {
            ValueKind::Array(array) => Some(array.values()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, FirestoreValue>> {
        match &self.kind {
            ValueKind::Map(map) => Some(map.fields()),
            _ => None,
        }
    }
}

impl From<bool> for FirestoreValue {
    fn from(value: bool) -> Self {
        Self::from_bool(value)
    }
}

impl From<i64> for FirestoreValue {
    fn from(value: i64) -> Self {
        Self::from_integer(value)
    }
}

impl From<i32> for FirestoreValue {
    fn from(value: i32) -> Self {
        Self::from_integer(value.into())
    }
}

impl From<u32> for FirestoreValue {
    fn from(value: u32) -> Self {
        Self::from_integer(value.into())
    }
}

impl From<f64> for FirestoreValue {
    fn from(value: f64) -> Self {
        Self::from_double(value)
    }
}

impl From<&str> for FirestoreValue {
    fn from(value: &str) -> Self {
        Self::from_string(value)
    }
}

impl From<String> for FirestoreValue {
    fn from(value: String) -> Self {
        Self::from_string(value)
    }
}

impl From<Timestamp> for FirestoreValue {
    fn from(value: Timestamp) -> Self {
        Self::from_timestamp(value)
    }
}

impl From<MapValue> for FirestoreValue {
    fn from(value: MapValue) -> Self {
        Self {
            kind: ValueKind::Map(value),
        }
    }
}

impl<T> From<Vec<T>> for FirestoreValue
where
    T: Into<FirestoreValue>,
{
    fn from(values: Vec<T>) -> Self {
        Self::from_array(values.into_iter().map(Into::into).collect())
    }
}

impl<T> From<BTreeMap<String, T>> for FirestoreValue
where
    T: Into<FirestoreValue>,
{
    fn from(map: BTreeMap<String, T>) -> Self {
        Self::from_map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T> From<Option<T>> for FirestoreValue
where
    T: Into<FirestoreValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_else(Self::null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_basic_values() {
        let v = FirestoreValue::from_string("hello");
        match v.kind() {
            ValueKind::String(value) => assert_eq!(value, "hello"),
            _ => panic!("unexpected kind"),
        }
        assert_eq!(FirestoreValue::from(Some(3)).as_integer(), Some(3));
        assert!(FirestoreValue::from(None::<i64>).is_null());
    }

    #[test]
    fn sequential_keys_become_array() {
        let value = FirestoreValue::from_keyed_entries([
            ("0", FirestoreValue::from("a")),
            ("1", FirestoreValue::from("b")),
        ]);
        assert_eq!(
            value,
            FirestoreValue::from_array(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn other_keys_become_map() {
        let value = FirestoreValue::from_keyed_entries([("x", FirestoreValue::from("a"))]);
        assert!(value.as_map().is_some());

        let gapped = FirestoreValue::from_keyed_entries([
            ("0", FirestoreValue::from(1)),
            ("2", FirestoreValue::from(2)),
        ]);
        assert!(gapped.as_map().is_some());

        let padded = FirestoreValue::from_keyed_entries([("00", FirestoreValue::from(1))]);
        assert!(padded.as_map().is_some());
    }

    #[test]
    fn empty_entries_become_empty_map() {
        let value = FirestoreValue::from_keyed_entries(Vec::<(String, FirestoreValue)>::new());
        assert_eq!(value, FirestoreValue::from_map(BTreeMap::new()));
        assert_eq!(
            FirestoreValue::from(Vec::<i64>::new()),
            FirestoreValue::from_array(Vec::new())
        );
    }

    #[test]
    fn json_interop() {
        let json = json!({
            "name": "ECG Monitor",
            "price": 1200,
            "rating": 4.5,
            "tags": ["cardiology", "monitor"],
            "image": null
        });
        let value = FirestoreValue::from_json(&json);
        let map = value.as_map().unwrap();
        assert_eq!(map["price"], FirestoreValue::from_integer(1200));
        assert_eq!(map["rating"], FirestoreValue::from_double(4.5));
        assert!(map["image"].is_null());
        assert_eq!(value.to_json(), json);
    }
}
