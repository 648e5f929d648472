use std::collections::BTreeMap;

use crate::error::{invalid_argument, FirestoreResult};
use crate::model::{FieldPath, IntoFieldPath};
use crate::value::{FirestoreValue, MapValue};

/// One `(path, value)` pair of an update.
///
/// The path is a dotted string (`"specifications.power"`) or an explicit
/// [`FieldPath`] when a segment itself contains a dot.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldUpdate {
    path: UpdatePath,
    value: FirestoreValue,
}

#[derive(Clone, Debug, PartialEq)]
enum UpdatePath {
    Dotted(String),
    Parsed(FieldPath),
}

impl FieldUpdate {
    pub fn new(path: impl Into<String>, value: impl Into<FirestoreValue>) -> Self {
        Self {
            path: UpdatePath::Dotted(path.into()),
            value: value.into(),
        }
    }

    pub fn with_field_path(path: FieldPath, value: impl Into<FirestoreValue>) -> Self {
        Self {
            path: UpdatePath::Parsed(path),
            value: value.into(),
        }
    }

    pub fn value(&self) -> &FirestoreValue {
        &self.value
    }

    fn field_path(&self) -> FirestoreResult<FieldPath> {
        match &self.path {
            UpdatePath::Dotted(path) => path.as_str().into_field_path(),
            UpdatePath::Parsed(path) => Ok(path.clone()),
        }
    }
}

/// Input accepted by `DocumentReference::update`.
#[derive(Clone, Debug, PartialEq)]
pub enum DocumentUpdate {
    /// Discrete nested paths. Only these paths change on the stored document.
    Paths(Vec<FieldUpdate>),
    /// Top-level fields, written the same way as `set`.
    Fields(MapValue),
}

impl From<Vec<FieldUpdate>> for DocumentUpdate {
    fn from(updates: Vec<FieldUpdate>) -> Self {
        DocumentUpdate::Paths(updates)
    }
}

impl From<FieldUpdate> for DocumentUpdate {
    fn from(update: FieldUpdate) -> Self {
        DocumentUpdate::Paths(vec![update])
    }
}

impl From<MapValue> for DocumentUpdate {
    fn from(fields: MapValue) -> Self {
        DocumentUpdate::Fields(fields)
    }
}

impl From<BTreeMap<String, FirestoreValue>> for DocumentUpdate {
    fn from(fields: BTreeMap<String, FirestoreValue>) -> Self {
        DocumentUpdate::Fields(MapValue::new(fields))
    }
}

/// Document body plus the field mask that goes with it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EncodedWrite {
    pub map: MapValue,
    pub field_paths: Vec<FieldPath>,
}

/// Every top-level key is written; other stored fields are left alone.
pub(crate) fn encode_set_data(data: MapValue) -> FirestoreResult<EncodedWrite> {
    if data.is_empty() {
        return Err(invalid_argument(
            "set requires at least one field; an empty mask would clear the document",
        ));
    }
    let field_paths = data
        .fields()
        .keys()
        .map(|key| FieldPath::new([key.as_str()]))
        .collect::<FirestoreResult<Vec<_>>>()?;
    Ok(EncodedWrite {
        map: data,
        field_paths,
    })
}

pub(crate) fn encode_update_data(update: DocumentUpdate) -> FirestoreResult<EncodedWrite> {
    match update {
        DocumentUpdate::Fields(fields) => encode_set_data(fields),
        DocumentUpdate::Paths(updates) => encode_field_updates(updates),
    }
}

/// Folds the paths into one nested map; paths sharing a prefix end up as
/// siblings under the same parent map.
fn encode_field_updates(updates: Vec<FieldUpdate>) -> FirestoreResult<EncodedWrite> {
    if updates.is_empty() {
        return Err(invalid_argument(
            "update requires at least one field/value pair",
        ));
    }

    let mut field_paths = Vec::with_capacity(updates.len());
    let mut map = MapValue::empty();
    for update in updates {
        let path = update.field_path()?;
        map.set(&path, update.value);
        field_paths.push(path);
    }

    validate_disjoint(&field_paths)?;
    Ok(EncodedWrite { map, field_paths })
}

fn validate_disjoint(paths: &[FieldPath]) -> FirestoreResult<()> {
    let mut sorted: Vec<&FieldPath> = paths.iter().collect();
    sorted.sort();
    for pair in sorted.windows(2) {
        let (first, second) = (pair[0], pair[1]);
        if first == second {
            return Err(invalid_argument(format!(
                "Field path '{first}' is updated more than once"
            )));
        }
        if first.is_prefix_of(second) {
            return Err(invalid_argument(format!(
                "Field path '{first}' conflicts with nested path '{second}'"
            )));
        }
    }
    Ok(())
}
