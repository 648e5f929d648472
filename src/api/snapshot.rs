use std::collections::BTreeMap;

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::FirestoreResult;
use crate::model::{DocumentKey, IntoFieldPath, Timestamp};
use crate::value::{FirestoreValue, MapValue};

static EMPTY_FIELDS: BTreeMap<String, FirestoreValue> = BTreeMap::new();

/// Read-only view of one document as returned by the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    key: DocumentKey,
    data: Option<MapValue>,
    create_time: Option<Timestamp>,
    update_time: Option<Timestamp>,
}

impl DocumentSnapshot {
    pub fn new(key: DocumentKey, data: Option<MapValue>) -> Self {
        Self {
            key,
            data,
            create_time: None,
            update_time: None,
        }
    }

    /// Snapshot for a document that does not exist.
    pub fn missing(key: DocumentKey) -> Self {
        Self::new(key, None)
    }

    pub fn with_create_time(mut self, create_time: Option<Timestamp>) -> Self {
        self.create_time = create_time;
        self
    }

    pub fn with_update_time(mut self, update_time: Option<Timestamp>) -> Self {
        self.update_time = update_time;
        self
    }

    /// Returns whether the document exists on the backend. A document stored
    /// without any fields still exists.
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// Decoded top-level fields; empty when the document does not exist.
    pub fn data(&self) -> &BTreeMap<String, FirestoreValue> {
        self.data
            .as_ref()
            .map(|map| map.fields())
            .unwrap_or(&EMPTY_FIELDS)
    }

    pub fn map_value(&self) -> Option<&MapValue> {
        self.data.as_ref()
    }

    /// Reads a possibly nested field, e.g. `"specifications.power"`.
    pub fn get(&self, field: impl IntoFieldPath) -> FirestoreResult<Option<&FirestoreValue>> {
        let path = field.into_field_path()?;
        Ok(self.data.as_ref().and_then(|map| map.get(&path)))
    }

    pub fn create_time(&self) -> Option<Timestamp> {
        self.create_time
    }

    pub fn update_time(&self) -> Option<Timestamp> {
        self.update_time
    }

    pub fn into_data(self) -> MapValue {
        self.data.unwrap_or_default()
    }

    /// Plain JSON rendering of the fields, for callers that map documents onto
    /// their own records.
    pub fn to_json(&self) -> JsonValue {
        let object: JsonMap<String, JsonValue> = self
            .data()
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        JsonValue::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key() -> DocumentKey {
        DocumentKey::from_string("products/p1").unwrap()
    }

    #[test]
    fn missing_snapshot_is_empty() {
        let snapshot = DocumentSnapshot::missing(key());
        assert!(!snapshot.exists());
        assert!(snapshot.data().is_empty());
        assert_eq!(snapshot.id(), "p1");
        assert_eq!(snapshot.get("anything").unwrap(), None);
    }

    #[test]
    fn document_without_fields_exists() {
        let snapshot = DocumentSnapshot::new(key(), Some(MapValue::empty()));
        assert!(snapshot.exists());
        assert!(snapshot.data().is_empty());
    }

    #[test]
    fn reads_nested_fields_and_renders_json() {
        let specifications = BTreeMap::from([
            ("model".to_string(), FirestoreValue::from_string("X1")),
            ("power".to_string(), FirestoreValue::from_string("220V")),
        ]);
        let data = BTreeMap::from([
            ("specifications".to_string(), FirestoreValue::from_map(specifications)),
            ("price".to_string(), FirestoreValue::from_integer(1200)),
        ]);
        let snapshot = DocumentSnapshot::new(key(), Some(MapValue::new(data)));

        assert_eq!(
            snapshot.get("specifications.model").unwrap(),
            Some(&FirestoreValue::from_string("X1"))
        );
        assert_eq!(
            snapshot.to_json(),
            json!({ "price": 1200, "specifications": { "model": "X1", "power": "220V" } })
        );
    }
}
