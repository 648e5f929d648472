use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value as JsonValue;

use crate::api::query::QueryDefinition;
use crate::api::DEFAULT_REQUEST_TIMEOUT;
use crate::api::DocumentSnapshot;
use crate::error::{malformed_response, FirestoreResult};
use crate::model::{DatabaseId, DocumentKey, FieldPath, ResourcePath};
use crate::remote::connection::{documents_path, Connection, ConnectionBuilder, RequestContext};
use crate::remote::serializer::JsonProtoSerializer;
use crate::remote::structured_query::encode_run_query_body;
use crate::value::MapValue;

use super::{Datastore, NoopTokenProvider, TokenProviderArc};

const UPDATE_MASK_PARAM: &str = "updateMask.fieldPaths";

/// [`Datastore`] backed by the Firestore REST API.
#[derive(Clone)]
pub struct HttpDatastore {
    connection: Connection,
    serializer: JsonProtoSerializer,
    auth_provider: TokenProviderArc,
    request_timeout: Duration,
}

#[derive(Clone)]
pub struct HttpDatastoreBuilder {
    database_id: DatabaseId,
    connection_builder: ConnectionBuilder,
    auth_provider: TokenProviderArc,
    request_timeout: Duration,
}

impl HttpDatastore {
    pub fn builder(database_id: DatabaseId) -> HttpDatastoreBuilder {
        HttpDatastoreBuilder::new(database_id)
    }

    pub fn from_database_id(database_id: DatabaseId) -> FirestoreResult<Self> {
        Self::builder(database_id).build()
    }

    pub fn serializer(&self) -> &JsonProtoSerializer {
        &self.serializer
    }

    fn request_context(&self) -> FirestoreResult<RequestContext> {
        Ok(RequestContext {
            auth_token: self.auth_provider.get_token()?,
            request_timeout: Some(self.request_timeout),
        })
    }
}

impl Datastore for HttpDatastore {
    fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        let context = self.request_context()?;
        let response = self.connection.invoke_json_optional(
            Method::GET,
            &documents_path(key.path()),
            &[],
            None,
            &context,
        )?;

        let Some(json) = response else {
            return Ok(DocumentSnapshot::missing(key.clone()));
        };
        let snapshot = self.serializer.decode_document(&json)?;
        if snapshot.key() != key {
            return Err(malformed_response(format!(
                "Requested document {} but Firestore returned {}",
                key.path(),
                snapshot.key().path()
            )));
        }
        Ok(snapshot)
    }

    fn set_document(
        &self,
        key: &DocumentKey,
        data: &MapValue,
        mask: &[FieldPath],
    ) -> FirestoreResult<()> {
        let context = self.request_context()?;
        let query: Vec<(&str, String)> = mask
            .iter()
            .map(|path| (UPDATE_MASK_PARAM, path.canonical_string()))
            .collect();
        let body = self.serializer.encode_document_fields(data);
        self.connection
            .invoke_json(
                Method::PATCH,
                &documents_path(key.path()),
                &query,
                Some(&body),
                &context,
            )
            .map(|_| ())
    }

    fn create_document(
        &self,
        collection: &ResourcePath,
        data: &MapValue,
    ) -> FirestoreResult<DocumentKey> {
        let context = self.request_context()?;
        let body = self.serializer.encode_document_fields(data);
        let response = self.connection.invoke_json(
            Method::POST,
            &documents_path(collection),
            &[],
            Some(&body),
            &context,
        )?;
        let name = response
            .get("name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| malformed_response("createDocument response is missing 'name'"))?;
        self.serializer.parse_document_name(name)
    }

    fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()> {
        let context = self.request_context()?;
        self.connection
            .invoke_json_optional(
                Method::DELETE,
                &documents_path(key.path()),
                &[],
                None,
                &context,
            )
            .map(|_| ())
    }

    fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>> {
        let context = self.request_context()?;
        let request_path = format!("{}:runQuery", documents_path(&query.parent_path()));
        let body = encode_run_query_body(&self.serializer, query);

        let response =
            self.connection
                .invoke_json(Method::POST, &request_path, &[], Some(&body), &context)?;

        let results = response
            .as_array()
            .ok_or_else(|| malformed_response("Firestore runQuery response must be an array"))?;

        let mut snapshots = Vec::new();
        for entry in results {
            // Entries without a document only carry the read time.
            let Some(document) = entry.get("document") else {
                continue;
            };
            snapshots.push(self.serializer.decode_document(document)?);
        }

        Ok(snapshots)
    }
}

impl HttpDatastoreBuilder {
    fn new(database_id: DatabaseId) -> Self {
        let connection_builder = Connection::builder(database_id.clone());
        Self {
            database_id,
            connection_builder,
            auth_provider: Arc::new(NoopTokenProvider),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_auth_provider(mut self, provider: TokenProviderArc) -> Self {
        self.auth_provider = provider;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connection_builder(mut self, builder: ConnectionBuilder) -> Self {
        self.connection_builder = builder;
        self
    }

    pub fn build(self) -> FirestoreResult<HttpDatastore> {
        let connection = self.connection_builder.build()?;
        Ok(HttpDatastore {
            connection,
            serializer: JsonProtoSerializer::new(self.database_id),
            auth_provider: self.auth_provider,
            request_timeout: self.request_timeout,
        })
    }
}
