mod database;
pub(crate) mod operations;
pub mod options;
pub(crate) mod query;
pub(crate) mod query_evaluator;
pub(crate) mod reference;
mod snapshot;

pub use database::Firestore;
pub use operations::{DocumentUpdate, FieldUpdate};
pub use options::{FirestoreOptions, DEFAULT_REQUEST_TIMEOUT};
pub use query::{
    FieldFilter, FilterOperator, IntoFilterOperator, OrderBy, OrderDirection, Query,
    QueryDefinition,
};
pub use reference::{CollectionReference, DocumentReference};
pub use snapshot::DocumentSnapshot;
