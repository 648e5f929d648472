use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::{json, Map as JsonMap, Value as JsonValue};

use crate::api::DocumentSnapshot;
use crate::error::{malformed_response, unsupported_value, FirestoreResult};
use crate::model::{DatabaseId, DocumentKey, ResourcePath, Timestamp};
use crate::value::{FirestoreValue, MapValue, ValueKind};

/// Converts between [`FirestoreValue`] and the REST API's JSON value
/// envelopes (`{"stringValue": ...}`, `{"mapValue": {"fields": ...}}`, ...).
#[derive(Clone, Debug)]
pub struct JsonProtoSerializer {
    database_id: DatabaseId,
}

impl JsonProtoSerializer {
    pub fn new(database_id: DatabaseId) -> Self {
        Self { database_id }
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    pub fn database_name(&self) -> String {
        self.database_id.resource_name()
    }

    pub fn document_name(&self, key: &DocumentKey) -> String {
        format!(
            "{}/documents/{}",
            self.database_name(),
            key.path().canonical_string()
        )
    }

    /// Resolves a full document resource name back to a key.
    pub fn parse_document_name(&self, name: &str) -> FirestoreResult<DocumentKey> {
        let prefix = format!("{}/documents/", self.database_name());
        let relative = name.strip_prefix(&prefix).ok_or_else(|| {
            malformed_response(format!(
                "Unexpected document name '{name}' returned by Firestore"
            ))
        })?;
        let path = ResourcePath::from_string(relative)
            .map_err(|err| malformed_response(err.message().to_string()))?;
        DocumentKey::from_path(path).map_err(|err| malformed_response(err.message().to_string()))
    }

    /// `{"fields": {...}}` body used by document writes.
    pub fn encode_document_fields(&self, map: &MapValue) -> JsonValue {
        json!({
            "fields": encode_map_fields(map)
        })
    }

    pub fn encode_value(&self, value: &FirestoreValue) -> JsonValue {
        encode_value(value)
    }

    pub fn decode_value(&self, value: &JsonValue) -> FirestoreResult<FirestoreValue> {
        decode_value(value)
    }

    /// Decodes the `fields` member of a document payload without failing:
    /// fields whose envelopes cannot be decoded come back as `null`.
    pub fn decode_document_fields(&self, document: &JsonValue) -> MapValue {
        let Some(fields) = document.get("fields").and_then(JsonValue::as_object) else {
            return MapValue::empty();
        };
        MapValue::new(decode_fields_lenient(fields))
    }

    /// Builds a snapshot from a `Document` payload (`name`, `fields`,
    /// `createTime`, `updateTime`).
    pub fn decode_document(&self, document: &JsonValue) -> FirestoreResult<DocumentSnapshot> {
        let name = document
            .get("name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| malformed_response("Firestore document is missing its 'name'"))?;
        let key = self.parse_document_name(name)?;
        let data = self.decode_document_fields(document);
        Ok(DocumentSnapshot::new(key, Some(data))
            .with_create_time(read_time_field(document, "createTime"))
            .with_update_time(read_time_field(document, "updateTime")))
    }
}

fn read_time_field(document: &JsonValue, field: &str) -> Option<Timestamp> {
    document
        .get(field)
        .and_then(JsonValue::as_str)
        .and_then(|value| Timestamp::parse_rfc3339(value).ok())
}

fn encode_map_fields(map: &MapValue) -> JsonValue {
    let mut fields = JsonMap::new();
    for (key, value) in map.fields() {
        fields.insert(key.clone(), encode_value(value));
    }
    JsonValue::Object(fields)
}

fn encode_value(value: &FirestoreValue) -> JsonValue {
    match value.kind() {
        ValueKind::Null => json!({ "nullValue": JsonValue::Null }),
        ValueKind::Boolean(boolean) => json!({ "booleanValue": boolean }),
        ValueKind::Integer(integer) => json!({ "integerValue": integer.to_string() }),
        ValueKind::Double(double) => json!({ "doubleValue": encode_double(*double) }),
        ValueKind::Timestamp(timestamp) => json!({ "timestampValue": timestamp.to_rfc3339() }),
        ValueKind::String(string) => json!({ "stringValue": string }),
        ValueKind::Array(array) => {
            let values = array.values().iter().map(encode_value).collect::<Vec<_>>();
            json!({ "arrayValue": { "values": values } })
        }
        ValueKind::Map(map) => json!({
            "mapValue": {
                "fields": encode_map_fields(map)
            }
        }),
    }
}

fn encode_double(value: f64) -> JsonValue {
    if value.is_nan() {
        json!("NaN")
    } else if value.is_infinite() {
        json!(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        json!(value)
    }
}

fn decode_fields_lenient(fields: &JsonMap<String, JsonValue>) -> BTreeMap<String, FirestoreValue> {
    let mut decoded = BTreeMap::new();
    for (key, value) in fields {
        let value = decode_value(value).unwrap_or_else(|err| {
            log::warn!("field '{key}' could not be decoded and is read as null: {err}");
            FirestoreValue::null()
        });
        decoded.insert(key.clone(), value);
    }
    decoded
}

fn decode_map_value(value: &JsonValue) -> FirestoreResult<BTreeMap<String, FirestoreValue>> {
    let map = value
        .as_object()
        .ok_or_else(|| malformed_response("Expected object for mapValue"))?;
    let fields_object = match map.get("fields") {
        Some(fields_value) => fields_value
            .as_object()
            .ok_or_else(|| malformed_response("Expected 'fields' to be an object"))?,
        None => return Ok(BTreeMap::new()),
    };

    let mut fields = BTreeMap::new();
    for (key, value) in fields_object {
        fields.insert(key.clone(), decode_value(value)?);
    }
    Ok(fields)
}

fn decode_value(value: &JsonValue) -> FirestoreResult<FirestoreValue> {
    let object = value
        .as_object()
        .ok_or_else(|| malformed_response("Expected Firestore value object"))?;
    if object.contains_key("nullValue") {
        return Ok(FirestoreValue::null());
    }
    if let Some(bool_value) = object.get("booleanValue") {
        let value = bool_value
            .as_bool()
            .ok_or_else(|| malformed_response("booleanValue must be bool"))?;
        return Ok(FirestoreValue::from_bool(value));
    }
    if let Some(integer_value) = object.get("integerValue") {
        let parsed = match integer_value {
            JsonValue::String(value) => i64::from_str(value)
                .map_err(|err| malformed_response(format!("Invalid integerValue: {err}")))?,
            JsonValue::Number(number) => number
                .as_i64()
                .ok_or_else(|| malformed_response("integerValue out of range"))?,
            _ => return Err(malformed_response("integerValue must be a string or number")),
        };
        return Ok(FirestoreValue::from_integer(parsed));
    }
    if let Some(double_value) = object.get("doubleValue") {
        let parsed = match double_value {
            JsonValue::Number(number) => number
                .as_f64()
                .ok_or_else(|| malformed_response("Invalid doubleValue"))?,
            JsonValue::String(value) => parse_double(value)?,
            _ => return Err(malformed_response("doubleValue must be a number or string")),
        };
        return Ok(FirestoreValue::from_double(parsed));
    }
    if let Some(timestamp_value) = object.get("timestampValue") {
        let timestamp_str = timestamp_value
            .as_str()
            .ok_or_else(|| malformed_response("timestampValue must be string"))?;
        let timestamp = Timestamp::parse_rfc3339(timestamp_str)
            .map_err(|err| malformed_response(err.message().to_string()))?;
        return Ok(FirestoreValue::from_timestamp(timestamp));
    }
    if let Some(string_value) = object.get("stringValue") {
        let str_value = string_value
            .as_str()
            .ok_or_else(|| malformed_response("stringValue must be string"))?;
        return Ok(FirestoreValue::from_string(str_value));
    }
    if let Some(array_value) = object.get("arrayValue") {
        let decoded = match array_value.get("values") {
            Some(JsonValue::Array(entries)) => entries
                .iter()
                .map(decode_value)
                .collect::<FirestoreResult<Vec<_>>>()?,
            Some(_) => return Err(malformed_response("arrayValue.values must be an array")),
            None => Vec::new(),
        };
        return Ok(FirestoreValue::from_array(decoded));
    }
    if let Some(map_value) = object.get("mapValue") {
        return Ok(FirestoreValue::from_map(decode_map_value(map_value)?));
    }

    let tag = object.keys().next().map(String::as_str).unwrap_or("<empty>");
    Err(unsupported_value(format!(
        "Unsupported Firestore value type '{tag}'"
    )))
}

fn parse_double(value: &str) -> FirestoreResult<f64> {
    match value {
        "NaN" => Ok(f64::NAN),
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        other => other
            .parse::<f64>()
            .map_err(|err| malformed_response(format!("Invalid doubleValue: {err}"))),
    }
}
