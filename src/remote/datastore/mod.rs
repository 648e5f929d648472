use std::sync::Arc;

use crate::api::query::QueryDefinition;
use crate::api::DocumentSnapshot;
use crate::error::FirestoreResult;
use crate::model::{DocumentKey, FieldPath, ResourcePath};
use crate::value::MapValue;

pub mod http;
pub mod in_memory;

/// Storage backend behind a [`crate::api::Firestore`] handle.
///
/// Every call is a single blocking exchange; implementations do not retry.
pub trait Datastore: Send + Sync + 'static {
    /// Reads one document. A missing document is a snapshot whose
    /// `exists()` is false, not an error.
    fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot>;

    /// Writes `data` under `key`, touching only the fields named in `mask`:
    /// masked paths present in `data` are written, masked paths absent from
    /// `data` are removed. An empty mask replaces the whole document.
    /// Creates the document when it does not exist.
    fn set_document(
        &self,
        key: &DocumentKey,
        data: &MapValue,
        mask: &[FieldPath],
    ) -> FirestoreResult<()>;

    /// Creates a document with a backend-assigned id inside `collection`.
    fn create_document(
        &self,
        collection: &ResourcePath,
        data: &MapValue,
    ) -> FirestoreResult<DocumentKey>;

    /// Deletes a document. Deleting a missing document succeeds.
    fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()>;

    fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>>;
}

/// Supplies the bearer token attached to each request.
///
/// Obtaining and refreshing tokens happens outside this crate; a provider
/// only hands out whatever token is current.
pub trait TokenProvider: Send + Sync + 'static {
    fn get_token(&self) -> FirestoreResult<Option<String>>;
}

/// Sends requests without an `Authorization` header (emulator use).
#[derive(Default, Clone, Debug)]
pub struct NoopTokenProvider;

impl TokenProvider for NoopTokenProvider {
    fn get_token(&self) -> FirestoreResult<Option<String>> {
        Ok(None)
    }
}

/// Hands out one fixed access token.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl TokenProvider for StaticTokenProvider {
    fn get_token(&self) -> FirestoreResult<Option<String>> {
        if self.token.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.token.clone()))
        }
    }
}

pub type TokenProviderArc = Arc<dyn TokenProvider>;

pub use http::{HttpDatastore, HttpDatastoreBuilder};
pub use in_memory::InMemoryDatastore;
