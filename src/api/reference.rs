use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::fmt::{Display, Formatter};

use crate::error::{invalid_argument, FirestoreResult};
use crate::model::{DocumentKey, IntoFieldPath, ResourcePath};
use crate::value::{FirestoreValue, MapValue};

use super::database::Firestore;
use super::operations::{encode_set_data, encode_update_data, DocumentUpdate};
use super::query::{IntoFilterOperator, OrderDirection, Query};
use super::snapshot::DocumentSnapshot;

#[derive(Clone)]
pub struct CollectionReference {
    firestore: Firestore,
    path: ResourcePath,
}

impl CollectionReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        if path.len() % 2 == 0 {
            return Err(invalid_argument(
                "Collection references must point to a collection (odd number of segments)",
            ));
        }
        Ok(Self { firestore, path })
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    /// The full resource path of the collection (e.g. `users/u1/orders`).
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// The last segment of the collection path.
    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    /// Returns the document that owns this collection, if it is a subcollection.
    pub fn parent(&self) -> Option<DocumentReference> {
        let parent_path = self.path.without_last();
        if parent_path.is_empty() {
            return None;
        }
        DocumentReference::new(self.firestore.clone(), parent_path).ok()
    }

    /// Returns a reference to the document identified by `document_id`.
    ///
    /// When `document_id` is `None`, a 20-character auto-ID is generated
    /// locally.
    pub fn doc(&self, document_id: Option<&str>) -> FirestoreResult<DocumentReference> {
        let id = document_id
            .map(|id| id.to_string())
            .unwrap_or_else(generate_auto_id);
        ResourcePath::validate_segment(&id)?;
        DocumentReference::new(self.firestore.clone(), self.path.child([id]))
    }

    /// Creates a document with a backend-assigned id.
    pub fn add(&self, data: impl Into<MapValue>) -> FirestoreResult<DocumentReference> {
        let data = data.into();
        let key = self
            .firestore
            .datastore()
            .create_document(&self.path, &data)?;
        log::debug!("created document {}", key.path());
        Ok(DocumentReference::from_key(self.firestore.clone(), key))
    }

    /// A query over the whole collection.
    pub fn query(&self) -> Query {
        Query::new(self.firestore.clone(), self.path.clone())
    }

    pub fn where_field(
        &self,
        field: impl IntoFieldPath,
        operator: impl IntoFilterOperator,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Query> {
        self.query().where_field(field, operator, value)
    }

    pub fn order_by(
        &self,
        field: impl IntoFieldPath,
        direction: impl Into<OrderDirection>,
    ) -> FirestoreResult<Query> {
        self.query().order_by(field, direction)
    }

    pub fn limit(&self, limit: u32) -> FirestoreResult<Query> {
        self.query().limit(limit)
    }

    /// Every document in the collection.
    pub fn documents(&self) -> FirestoreResult<Vec<DocumentSnapshot>> {
        self.query().documents()
    }
}

impl std::fmt::Debug for CollectionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionReference")
            .field("path", &self.path)
            .finish()
    }
}

impl Display for CollectionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CollectionReference({})", self.path.canonical_string())
    }
}

/// Handle on a single document. Holds no state besides its path, so it can
/// be kept around and reused.
#[derive(Clone)]
pub struct DocumentReference {
    firestore: Firestore,
    key: DocumentKey,
}

impl DocumentReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        let key = DocumentKey::from_path(path)?;
        Ok(Self { firestore, key })
    }

    pub(crate) fn from_key(firestore: Firestore, key: DocumentKey) -> Self {
        Self { firestore, key }
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    /// The document identifier (the last segment of its path).
    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// The parent collection containing this document.
    pub fn parent(&self) -> CollectionReference {
        CollectionReference {
            firestore: self.firestore.clone(),
            path: self.key.collection_path(),
        }
    }

    /// Returns a reference to a subcollection rooted at this document.
    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        let sub_path = ResourcePath::from_string(path)?;
        let full_path = self.key.path().child(sub_path.iter().cloned());
        CollectionReference::new(self.firestore.clone(), full_path)
    }

    /// Fetches the document. A document that does not exist comes back as a
    /// snapshot with `exists() == false` and no data.
    pub fn get(&self) -> FirestoreResult<DocumentSnapshot> {
        self.firestore.datastore().get_document(&self.key)
    }

    /// Writes every top-level field of `data`.
    ///
    /// This is a merge: the listed fields are replaced wholesale (nested maps
    /// included) while stored fields not named in `data` are kept. Creates the
    /// document when missing. `data` must not be empty.
    pub fn set(&self, data: impl Into<MapValue>) -> FirestoreResult<()> {
        let encoded = encode_set_data(data.into())?;
        self.firestore
            .datastore()
            .set_document(&self.key, &encoded.map, &encoded.field_paths)
    }

    /// Applies an update.
    ///
    /// With [`DocumentUpdate::Paths`] only the given (possibly nested) paths
    /// change, in one atomic write:
    ///
    /// ```
    /// # use firestore_rest_lite::api::{Firestore, FieldUpdate};
    /// let firestore = Firestore::in_memory("demo");
    /// let pump = firestore.doc("products/pump").unwrap();
    /// pump.update(vec![FieldUpdate::new("specifications.power", "220V")]).unwrap();
    /// let snapshot = pump.get().unwrap();
    /// assert_eq!(
    ///     snapshot.get("specifications.power").unwrap().and_then(|v| v.as_str()),
    ///     Some("220V")
    /// );
    /// ```
    ///
    /// A plain map behaves exactly like [`DocumentReference::set`].
    pub fn update(&self, update: impl Into<DocumentUpdate>) -> FirestoreResult<()> {
        let encoded = encode_update_data(update.into())?;
        self.firestore
            .datastore()
            .set_document(&self.key, &encoded.map, &encoded.field_paths)
    }

    /// Deletes the document. Deleting a document that does not exist succeeds.
    pub fn delete(&self) -> FirestoreResult<()> {
        self.firestore.datastore().delete_document(&self.key)
    }
}

impl std::fmt::Debug for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentReference")
            .field("key", &self.key)
            .finish()
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DocumentReference({})",
            self.key.path().canonical_string()
        )
    }
}

pub(crate) fn generate_auto_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(20)
        .collect()
}
