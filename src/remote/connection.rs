use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Method, StatusCode};
use serde_json::Value as JsonValue;
use url::Url;

use crate::error::{
    deadline_exceeded, internal_error, invalid_argument, malformed_response, transport_error,
    FirestoreResult,
};
use crate::model::{DatabaseId, ResourcePath};

use super::rpc_error::map_http_error;

const FIRESTORE_API_HOST: &str = "https://firestore.googleapis.com";
const FIRESTORE_API_VERSION: &str = "v1";

/// Characters escaped inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Blocking HTTP connection to one Firestore database.
///
/// Every request goes through [`Connection::execute`], which attaches the
/// bearer token and JSON content type, enforces the request timeout and logs
/// failed responses together with their body.
#[derive(Clone, Debug)]
pub struct Connection {
    client: Client,
    base_url: String,
}

#[derive(Clone, Debug)]
pub struct ConnectionBuilder {
    database_id: DatabaseId,
    client: Option<Client>,
    emulator_host: Option<String>,
}

#[derive(Default, Clone, Debug)]
pub struct RequestContext {
    pub auth_token: Option<String>,
    pub request_timeout: Option<Duration>,
}

struct HttpReply {
    status: StatusCode,
    body: String,
}

impl ConnectionBuilder {
    pub fn new(database_id: DatabaseId) -> Self {
        Self {
            database_id,
            client: None,
            emulator_host: None,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Talks plain HTTP to `host` (e.g. `localhost:8080`) instead of the
    /// production endpoint.
    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.emulator_host = Some(host.into());
        self
    }

    pub fn build(self) -> FirestoreResult<Connection> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(format!("firestore-rest-lite/{}", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|err| internal_error(format!("Failed to build HTTP client: {err}")))?,
        };
        let base_url = build_base_url(&self.database_id, self.emulator_host.as_deref());
        Ok(Connection { client, base_url })
    }
}

impl Connection {
    pub fn builder(database_id: DatabaseId) -> ConnectionBuilder {
        ConnectionBuilder::new(database_id)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request and decodes the JSON reply. Any non-success status is
    /// an error.
    pub fn invoke_json(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&JsonValue>,
        context: &RequestContext,
    ) -> FirestoreResult<JsonValue> {
        let reply = self.execute(method, path, query, body, context)?;
        if !reply.status.is_success() {
            return Err(map_http_error(reply.status, &reply.body));
        }
        parse_body(&reply.body)
    }

    /// Like [`Connection::invoke_json`], but a 404 yields `Ok(None)`.
    pub fn invoke_json_optional(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&JsonValue>,
        context: &RequestContext,
    ) -> FirestoreResult<Option<JsonValue>> {
        let reply = self.execute(method, path, query, body, context)?;
        if reply.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !reply.status.is_success() {
            return Err(map_http_error(reply.status, &reply.body));
        }
        parse_body(&reply.body).map(Some)
    }

    fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&JsonValue>,
        context: &RequestContext,
    ) -> FirestoreResult<HttpReply> {
        let url = self.request_url(path, query)?;
        log::debug!("firestore request: {method} {url}");

        let mut request = self.build_request(method.clone(), url.clone(), context);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().map_err(|err| {
            log::error!("firestore request {method} {url} failed: {err}");
            if err.is_timeout() {
                deadline_exceeded(format!("Request to {url} timed out"))
            } else {
                transport_error(err.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| transport_error(format!("Failed to read response body: {err}")))?;

        if status.as_u16() >= 400 {
            if status == StatusCode::NOT_FOUND {
                log::debug!("firestore {method} {url} returned 404: {body}");
            } else {
                log::error!("firestore {method} {url} returned {status}: {body}");
            }
        }

        Ok(HttpReply { status, body })
    }

    fn request_url(&self, path: &str, query: &[(&str, String)]) -> FirestoreResult<Url> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw)
            .map_err(|err| invalid_argument(format!("Invalid request URL '{raw}': {err}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    fn build_request(&self, method: Method, url: Url, context: &RequestContext) -> RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(timeout) = context.request_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(token) = context.auth_token.as_deref() {
            builder = builder.bearer_auth(token);
        }
        builder.header("Content-Type", "application/json")
    }
}

/// Renders `documents/<path>` with every segment percent-encoded.
pub(crate) fn documents_path(path: &ResourcePath) -> String {
    let mut rendered = String::from("documents");
    for segment in path.iter() {
        rendered.push('/');
        rendered.extend(utf8_percent_encode(segment, PATH_SEGMENT));
    }
    rendered
}

fn parse_body(body: &str) -> FirestoreResult<JsonValue> {
    if body.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    serde_json::from_str(body)
        .map_err(|err| malformed_response(format!("Firestore returned invalid JSON: {err}")))
}

fn build_base_url(database_id: &DatabaseId, emulator_host: Option<&str>) -> String {
    match emulator_host.map(strip_scheme) {
        Some(host) => format!(
            "http://{host}/{FIRESTORE_API_VERSION}/{}",
            database_id.resource_name()
        ),
        None => format!(
            "{FIRESTORE_API_HOST}/{FIRESTORE_API_VERSION}/{}",
            database_id.resource_name()
        ),
    }
}

/// Accepts `localhost:8080` as well as `http://localhost:8080/`.
fn strip_scheme(host: &str) -> &str {
    let host = host.trim();
    let host = host
        .strip_prefix("http://")
        .or_else(|| host.strip_prefix("https://"))
        .unwrap_or(host);
    host.trim_end_matches('/')
}
