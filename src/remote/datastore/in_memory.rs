use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::query::QueryDefinition;
use crate::api::query_evaluator::apply_query_to_documents;
use crate::api::reference::generate_auto_id;
use crate::api::DocumentSnapshot;
use crate::error::FirestoreResult;
use crate::model::{DocumentKey, FieldPath, ResourcePath, Timestamp};
use crate::value::MapValue;

use super::Datastore;

#[derive(Clone, Debug)]
struct StoredDocument {
    fields: MapValue,
    create_time: Timestamp,
    update_time: Timestamp,
}

type Documents = BTreeMap<DocumentKey, StoredDocument>;

/// Process-local [`Datastore`] with the same write-mask and query semantics
/// as the REST backend. Clones share the same documents.
#[derive(Clone, Default)]
pub struct InMemoryDatastore {
    documents: Arc<Mutex<Documents>>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    fn store(&self) -> MutexGuard<'_, Documents> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn write(store: &mut Documents, key: DocumentKey, fields: MapValue) {
    let now = Timestamp::now();
    let create_time = store
        .get(&key)
        .map(|existing| existing.create_time)
        .unwrap_or(now);
    store.insert(
        key,
        StoredDocument {
            fields,
            create_time,
            update_time: now,
        },
    );
}

fn snapshot_for(key: &DocumentKey, stored: &StoredDocument) -> DocumentSnapshot {
    DocumentSnapshot::new(key.clone(), Some(stored.fields.clone()))
        .with_create_time(Some(stored.create_time))
        .with_update_time(Some(stored.update_time))
}

impl Datastore for InMemoryDatastore {
    fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        let store = self.store();
        Ok(match store.get(key) {
            Some(stored) => snapshot_for(key, stored),
            None => DocumentSnapshot::missing(key.clone()),
        })
    }

    fn set_document(
        &self,
        key: &DocumentKey,
        data: &MapValue,
        mask: &[FieldPath],
    ) -> FirestoreResult<()> {
        let mut store = self.store();
        if mask.is_empty() {
            write(&mut store, key.clone(), data.clone());
            return Ok(());
        }

        let mut fields = store
            .get(key)
            .map(|existing| existing.fields.clone())
            .unwrap_or_default();
        for path in mask {
            match data.get(path) {
                Some(value) => fields.set(path, value.clone()),
                None => {
                    fields.remove(path);
                }
            }
        }
        write(&mut store, key.clone(), fields);
        Ok(())
    }

    fn create_document(
        &self,
        collection: &ResourcePath,
        data: &MapValue,
    ) -> FirestoreResult<DocumentKey> {
        let key = DocumentKey::from_path(collection.child([generate_auto_id()]))?;
        write(&mut self.store(), key.clone(), data.clone());
        Ok(key)
    }

    fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()> {
        self.store().remove(key);
        Ok(())
    }

    fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>> {
        let candidates: Vec<DocumentSnapshot> = self
            .store()
            .iter()
            .filter(|(key, _)| query.matches_collection(key))
            .map(|(key, stored)| snapshot_for(key, stored))
            .collect();
        Ok(apply_query_to_documents(candidates, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FirestoreValue;

    fn key(path: &str) -> DocumentKey {
        DocumentKey::from_string(path).unwrap()
    }

    fn field(path: &str) -> FieldPath {
        FieldPath::from_dot_separated(path).unwrap()
    }

    #[test]
    fn mask_writes_listed_paths_and_removes_absent_ones() {
        let store = InMemoryDatastore::new();
        let mut initial = MapValue::empty();
        initial.set(&field("name"), FirestoreValue::from_string("Pump"));
        initial.set(&field("stock"), FirestoreValue::from_integer(3));
        store.set_document(&key("products/p1"), &initial, &[]).unwrap();

        let mut patch = MapValue::empty();
        patch.set(&field("name"), FirestoreValue::from_string("Infusion pump"));
        store
            .set_document(&key("products/p1"), &patch, &[field("name"), field("stock")])
            .unwrap();

        let snapshot = store.get_document(&key("products/p1")).unwrap();
        assert_eq!(
            snapshot.data().get("name"),
            Some(&FirestoreValue::from_string("Infusion pump"))
        );
        assert!(snapshot.data().get("stock").is_none());
    }

    #[test]
    fn create_assigns_id_in_collection() {
        let store = InMemoryDatastore::new();
        let collection = ResourcePath::from_string("contacts").unwrap();
        let created = store.create_document(&collection, &MapValue::empty()).unwrap();
        assert_eq!(created.collection_path(), collection);
        assert_eq!(created.id().len(), 20);
        assert!(store.get_document(&created).unwrap().exists());
    }

    #[test]
    fn keeps_create_time_across_writes() {
        let store = InMemoryDatastore::new();
        let k = key("orders/o1");
        store.set_document(&k, &MapValue::empty(), &[]).unwrap();
        let first = store.get_document(&k).unwrap();
        store.set_document(&k, &MapValue::empty(), &[]).unwrap();
        let second = store.get_document(&k).unwrap();
        assert_eq!(first.create_time(), second.create_time());
        assert!(second.update_time() >= first.update_time());
    }

    #[test]
    fn concurrent_masked_writes_are_not_lost() {
        let store = InMemoryDatastore::new();
        let k = key("products/p1");
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                let k = k.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let path = field(&format!("specs.f{t}_{i}"));
                        let mut patch = MapValue::empty();
                        patch.set(&path, FirestoreValue::from_integer(i));
                        store.set_document(&k, &patch, &[path]).unwrap();
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().unwrap();
        }

        let snapshot = store.get_document(&k).unwrap();
        let specs = snapshot.data()["specs"].as_map().unwrap();
        assert_eq!(specs.len(), 800);
    }
}
