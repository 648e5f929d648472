#![doc = include_str!("RUSTDOC.md")]

pub mod api;
pub mod error;
pub mod model;
pub mod remote;
pub mod value;

#[cfg(test)]
pub mod test_support;

pub use api::{
    CollectionReference, DocumentReference, DocumentSnapshot, DocumentUpdate, FieldUpdate,
    Firestore, FirestoreOptions, Query,
};
pub use error::{FailureKind, FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use value::{FirestoreValue, MapValue};
