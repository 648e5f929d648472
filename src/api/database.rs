use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::error::FirestoreResult;
use crate::model::{DatabaseId, ResourcePath};
use crate::remote::connection::Connection;
use crate::remote::datastore::{
    Datastore, HttpDatastore, InMemoryDatastore, NoopTokenProvider, StaticTokenProvider,
    TokenProviderArc,
};

use super::options::FirestoreOptions;
use super::reference::{CollectionReference, DocumentReference};

/// Handle on one Firestore database.
///
/// Cheap to clone; clones share the same backend. There is no global
/// instance: build one and pass it to whatever needs it.
#[derive(Clone)]
pub struct Firestore {
    inner: Arc<FirestoreInner>,
}

struct FirestoreInner {
    database_id: DatabaseId,
    datastore: Arc<dyn Datastore>,
}

impl Firestore {
    /// Connects to the REST endpoint described by `options`.
    pub fn new(options: FirestoreOptions) -> FirestoreResult<Self> {
        let database_id = options.database_id()?;

        let auth_provider: TokenProviderArc = match options.access_token() {
            Some(token) => Arc::new(StaticTokenProvider::new(token)),
            None => Arc::new(NoopTokenProvider),
        };

        let mut connection = Connection::builder(database_id.clone());
        if let Some(host) = options.emulator_host() {
            connection = connection.with_emulator_host(host);
        }

        let datastore = HttpDatastore::builder(database_id.clone())
            .with_auth_provider(auth_provider)
            .with_request_timeout(options.request_timeout())
            .with_connection_builder(connection)
            .build()?;

        log::debug!(
            "firestore client for {} (emulator: {})",
            database_id.resource_name(),
            options.emulator_host().unwrap_or("none")
        );
        Ok(Self::with_datastore(database_id, Arc::new(datastore)))
    }

    /// Uses an already built backend.
    pub fn with_datastore(database_id: DatabaseId, datastore: Arc<dyn Datastore>) -> Self {
        let inner = FirestoreInner {
            database_id,
            datastore,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// A handle whose documents live in process memory only. Useful for
    /// tests and demos.
    pub fn in_memory(project_id: impl Into<String>) -> Self {
        Self::with_datastore(
            DatabaseId::default(project_id),
            Arc::new(InMemoryDatastore::new()),
        )
    }

    /// The fully qualified database identifier (project + database name).
    pub fn database_id(&self) -> &DatabaseId {
        &self.inner.database_id
    }

    pub fn project_id(&self) -> &str {
        self.inner.database_id.project_id()
    }

    pub(crate) fn datastore(&self) -> &dyn Datastore {
        self.inner.datastore.as_ref()
    }

    /// Creates a `CollectionReference` pointing at `path`.
    ///
    /// The path is interpreted relative to the database root using forward
    /// slashes to separate segments (e.g. `"users/u1/orders"`).
    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        let resource = ResourcePath::from_string(path)?;
        CollectionReference::new(self.clone(), resource)
    }

    /// Creates a `DocumentReference` pointing at `path`.
    ///
    /// The path must contain an even number of segments (collection/doc pairs).
    pub fn doc(&self, path: &str) -> FirestoreResult<DocumentReference> {
        let resource = ResourcePath::from_string(path)?;
        DocumentReference::new(self.clone(), resource)
    }
}

impl Debug for Firestore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Firestore")
            .field("database_id", &self.inner.database_id)
            .finish()
    }
}
