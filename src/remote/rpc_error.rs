use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{
    deadline_exceeded, failed_precondition, internal_error, invalid_argument, not_found,
    permission_denied, resource_exhausted, unauthenticated, unavailable, FirestoreError,
};

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: Option<GoogleError>,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Maps a non-success response to an error, preferring the canonical status
/// string of a Google error body over the bare HTTP status.
pub fn map_http_error(status: StatusCode, body: &str) -> FirestoreError {
    let payload = extract_error_payload(body);
    let message = payload
        .as_ref()
        .and_then(|payload| payload.message.clone())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("HTTP error").to_string());

    let error = match payload.as_ref().and_then(|payload| payload.status.as_deref()) {
        Some(canonical) => map_status_code(canonical, message),
        None => map_status(status, message),
    };
    error.with_http_status(status.as_u16())
}

fn map_status(status: StatusCode, message: String) -> FirestoreError {
    match status {
        StatusCode::BAD_REQUEST => invalid_argument(message),
        StatusCode::UNAUTHORIZED => unauthenticated(message),
        StatusCode::FORBIDDEN => permission_denied(message),
        StatusCode::NOT_FOUND => not_found(message),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => failed_precondition(message),
        StatusCode::TOO_MANY_REQUESTS => resource_exhausted(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => deadline_exceeded(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => unavailable(message),
        status if status.is_client_error() => invalid_argument(message),
        _ => internal_error(message),
    }
}

fn map_status_code(status: &str, message: String) -> FirestoreError {
    match status {
        "INVALID_ARGUMENT" | "OUT_OF_RANGE" => invalid_argument(message),
        "FAILED_PRECONDITION" | "ALREADY_EXISTS" | "ABORTED" => failed_precondition(message),
        "UNAUTHENTICATED" => unauthenticated(message),
        "PERMISSION_DENIED" => permission_denied(message),
        "NOT_FOUND" => not_found(message),
        "RESOURCE_EXHAUSTED" => resource_exhausted(message),
        "UNAVAILABLE" => unavailable(message),
        "DEADLINE_EXCEEDED" => deadline_exceeded(message),
        _ => internal_error(message),
    }
}

fn extract_error_payload(body: &str) -> Option<GoogleError> {
    serde_json::from_str::<GoogleErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureKind, FirestoreErrorCode};

    #[test]
    fn uses_google_status_when_present() {
        let body = r#"{"error":{"code":400,"message":"no index","status":"FAILED_PRECONDITION"}}"#;
        let err = map_http_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code, FirestoreErrorCode::FailedPrecondition);
        assert_eq!(err.message(), "no index");
        assert_eq!(err.http_status(), Some(400));
        assert_eq!(err.kind(), FailureKind::Status);
    }

    #[test]
    fn falls_back_to_http_status() {
        let err = map_http_error(StatusCode::FORBIDDEN, "<html>denied</html>");
        assert_eq!(err.code, FirestoreErrorCode::PermissionDenied);
        assert_eq!(err.message(), "Forbidden");

        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(err.code, FirestoreErrorCode::Unavailable);

        let err = map_http_error(StatusCode::IM_A_TEAPOT, "");
        assert_eq!(err.code, FirestoreErrorCode::InvalidArgument);
    }
}
