//! Connection settings for a [`Firestore`](super::Firestore) handle.

use std::env;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{invalid_argument, missing_project_id, FirestoreResult};
use crate::model::{DatabaseId, DEFAULT_DATABASE_ID};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const PROJECT_ID_VARS: [&str; 2] = ["FIRESTORE_PROJECT_ID", "GOOGLE_CLOUD_PROJECT"];
const DATABASE_VAR: &str = "FIRESTORE_DATABASE";
const ACCESS_TOKEN_VAR: &str = "FIRESTORE_ACCESS_TOKEN";
const EMULATOR_HOST_VAR: &str = "FIRESTORE_EMULATOR_HOST";
const REQUEST_TIMEOUT_VAR: &str = "FIRESTORE_REQUEST_TIMEOUT_SECS";

#[derive(Clone, PartialEq, Eq)]
pub struct FirestoreOptions {
    project_id: String,
    database: String,
    access_token: Option<String>,
    emulator_host: Option<String>,
    request_timeout: Duration,
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    project_id: Option<String>,
}

impl FirestoreOptions {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: DEFAULT_DATABASE_ID.to_string(),
            access_token: None,
            emulator_host: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Reads settings from the process environment.
    ///
    /// `FIRESTORE_PROJECT_ID` (or `GOOGLE_CLOUD_PROJECT`) is required;
    /// `FIRESTORE_DATABASE`, `FIRESTORE_ACCESS_TOKEN`,
    /// `FIRESTORE_EMULATOR_HOST` and `FIRESTORE_REQUEST_TIMEOUT_SECS` are
    /// optional.
    pub fn from_env() -> FirestoreResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> FirestoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let project_id = PROJECT_ID_VARS
            .iter()
            .find_map(|name| read(name))
            .ok_or_else(missing_project_id)?;

        let mut options = Self::new(project_id);
        if let Some(database) = read(DATABASE_VAR) {
            options.database = database;
        }
        options.access_token = read(ACCESS_TOKEN_VAR);
        options.emulator_host = read(EMULATOR_HOST_VAR);
        if let Some(raw) = read(REQUEST_TIMEOUT_VAR) {
            let seconds: u64 = raw.parse().map_err(|_| {
                invalid_argument(format!(
                    "{REQUEST_TIMEOUT_VAR} must be a whole number of seconds, got '{raw}'"
                ))
            })?;
            options.request_timeout = Duration::from_secs(seconds);
        }
        Ok(options)
    }

    /// Takes the project id from a service-account key. Exchanging the key for
    /// an access token happens elsewhere; pass the token with
    /// [`FirestoreOptions::with_access_token`].
    pub fn from_service_account_json(json: &str) -> FirestoreResult<Self> {
        let key: ServiceAccountKey = serde_json::from_str(json).map_err(|err| {
            invalid_argument(format!("Service account key is not valid JSON: {err}"))
        })?;
        match key.project_id.filter(|id| !id.is_empty()) {
            Some(project_id) => Ok(Self::new(project_id)),
            None => Err(missing_project_id()),
        }
    }

    pub fn from_service_account_file(path: impl AsRef<Path>) -> FirestoreResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| {
            invalid_argument(format!(
                "Unable to read service account key {}: {err}",
                path.display()
            ))
        })?;
        Self::from_service_account_json(&contents)
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Targets a local emulator (`host:port`) over plain HTTP.
    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.emulator_host = Some(host.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn emulator_host(&self) -> Option<&str> {
        self.emulator_host.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn database_id(&self) -> FirestoreResult<DatabaseId> {
        if self.project_id.trim().is_empty() {
            return Err(missing_project_id());
        }
        if self.database.trim().is_empty() {
            return Err(invalid_argument("Database name cannot be empty"));
        }
        Ok(DatabaseId::new(self.project_id.clone(), self.database.clone()))
    }
}

impl Debug for FirestoreOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreOptions")
            .field("project_id", &self.project_id)
            .field("database", &self.database)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("emulator_host", &self.emulator_host)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FirestoreErrorCode;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn reads_environment() {
        let options = FirestoreOptions::from_lookup(lookup(&[
            ("FIRESTORE_PROJECT_ID", "shop"),
            ("FIRESTORE_DATABASE", "catalog"),
            ("FIRESTORE_ACCESS_TOKEN", "ya29.token"),
            ("FIRESTORE_REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(options.project_id(), "shop");
        assert_eq!(options.database(), "catalog");
        assert_eq!(options.access_token(), Some("ya29.token"));
        assert_eq!(options.emulator_host(), None);
        assert_eq!(options.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn falls_back_to_google_cloud_project_and_defaults() {
        let options =
            FirestoreOptions::from_lookup(lookup(&[("GOOGLE_CLOUD_PROJECT", "gcp")])).unwrap();
        assert_eq!(options.project_id(), "gcp");
        assert_eq!(options.database(), "(default)");
        assert_eq!(options.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn missing_project_is_an_error() {
        let err = FirestoreOptions::from_lookup(lookup(&[("FIRESTORE_PROJECT_ID", "  ")]))
            .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::MissingProjectId);
    }

    #[test]
    fn rejects_bad_timeout() {
        let err = FirestoreOptions::from_lookup(lookup(&[
            ("FIRESTORE_PROJECT_ID", "shop"),
            ("FIRESTORE_REQUEST_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::InvalidArgument);
    }

    #[test]
    fn reads_service_account_key() {
        let options = FirestoreOptions::from_service_account_json(
            r#"{"type":"service_account","project_id":"shop-prod","client_email":"x@y"}"#,
        )
        .unwrap();
        assert_eq!(options.project_id(), "shop-prod");

        let err = FirestoreOptions::from_service_account_json(r#"{"type":"service_account"}"#)
            .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::MissingProjectId);
    }

    #[test]
    fn debug_redacts_token() {
        let options = FirestoreOptions::new("shop").with_access_token("secret");
        let rendered = format!("{options:?}");
        assert!(!rendered.contains("secret"));
    }
}
