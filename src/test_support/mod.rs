//! Test utilities shared across crate-level unit tests.

use std::panic;

use httpmock::MockServer;

use crate::api::{Firestore, FirestoreOptions};

/// Start a fresh `httpmock::MockServer` instance for use in unit tests.
pub fn start_mock_server() -> MockServer {
    MockServer::start()
}

/// Starts a mock server, or returns `None` (after logging why) when the
/// sandbox does not allow binding a local port.
pub fn try_start_mock_server(test_name: &str) -> Option<MockServer> {
    match panic::catch_unwind(start_mock_server) {
        Ok(server) => Some(server),
        Err(_) => {
            eprintln!("Skipping {test_name}: unable to bind httpmock server.");
            None
        }
    }
}

/// A client for project `shop` that talks to `server` with bearer token
/// `test-token`.
pub fn firestore_for(server: &MockServer) -> Firestore {
    let options = FirestoreOptions::new("shop")
        .with_emulator_host(server.address().to_string())
        .with_access_token("test-token");
    Firestore::new(options).expect("mock firestore")
}

/// Path prefix of every document URL served for project `shop`.
pub const DOCUMENTS_PREFIX: &str = "/v1/projects/shop/databases/(default)/documents";
