use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FirestoreErrorCode {
    InvalidArgument,
    MissingProjectId,
    Transport,
    MalformedResponse,
    UnsupportedValue,
    Internal,
    NotFound,
    PermissionDenied,
    Unauthenticated,
    Unavailable,
    DeadlineExceeded,
    ResourceExhausted,
    FailedPrecondition,
}

/// Coarse classification of a failure.
///
/// Lets callers tell an unreachable backend apart from a rejected request or
/// an unreadable response without matching every code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The request never produced an HTTP response.
    Transport,
    /// The backend answered with a non-success status.
    Status,
    /// The backend answered, but the body could not be understood.
    MalformedResponse,
    /// The caller supplied something the client refuses to send.
    InvalidArgument,
}

impl FirestoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirestoreErrorCode::InvalidArgument => "firestore/invalid-argument",
            FirestoreErrorCode::MissingProjectId => "firestore/missing-project-id",
            FirestoreErrorCode::Transport => "firestore/transport",
            FirestoreErrorCode::MalformedResponse => "firestore/malformed-response",
            FirestoreErrorCode::UnsupportedValue => "firestore/unsupported-value",
            FirestoreErrorCode::Internal => "firestore/internal",
            FirestoreErrorCode::NotFound => "firestore/not-found",
            FirestoreErrorCode::PermissionDenied => "firestore/permission-denied",
            FirestoreErrorCode::Unauthenticated => "firestore/unauthenticated",
            FirestoreErrorCode::Unavailable => "firestore/unavailable",
            FirestoreErrorCode::DeadlineExceeded => "firestore/deadline-exceeded",
            FirestoreErrorCode::ResourceExhausted => "firestore/resource-exhausted",
            FirestoreErrorCode::FailedPrecondition => "firestore/failed-precondition",
        }
    }
}

#[derive(Clone, Debug)]
pub struct FirestoreError {
    pub code: FirestoreErrorCode,
    message: String,
    http_status: Option<u16>,
}

impl FirestoreError {
    pub fn new(code: FirestoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: None,
        }
    }

    pub(crate) fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status returned by the backend, when the failure came from one.
    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    pub fn kind(&self) -> FailureKind {
        if self.http_status.is_some() {
            return FailureKind::Status;
        }
        match self.code {
            FirestoreErrorCode::Transport | FirestoreErrorCode::DeadlineExceeded => {
                FailureKind::Transport
            }
            FirestoreErrorCode::MalformedResponse | FirestoreErrorCode::UnsupportedValue => {
                FailureKind::MalformedResponse
            }
            FirestoreErrorCode::InvalidArgument | FirestoreErrorCode::MissingProjectId => {
                FailureKind::InvalidArgument
            }
            _ => FailureKind::Status,
        }
    }
}

impl Display for FirestoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.http_status {
            Some(status) => write!(f, "{} ({}, HTTP {status})", self.message, self.code_str()),
            None => write!(f, "{} ({})", self.message, self.code_str()),
        }
    }
}

impl Error for FirestoreError {}

pub type FirestoreResult<T> = Result<T, FirestoreError>;

pub fn invalid_argument(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::InvalidArgument, message)
}

pub fn missing_project_id() -> FirestoreError {
    FirestoreError::new(
        FirestoreErrorCode::MissingProjectId,
        "A project id is required to use Firestore",
    )
}

pub fn transport_error(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Transport, message)
}

pub fn malformed_response(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::MalformedResponse, message)
}

pub fn unsupported_value(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::UnsupportedValue, message)
}

pub fn internal_error(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Internal, message)
}

pub fn not_found(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::NotFound, message)
}

pub fn permission_denied(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::PermissionDenied, message)
}

pub fn unauthenticated(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Unauthenticated, message)
}

pub fn unavailable(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Unavailable, message)
}

pub fn deadline_exceeded(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::DeadlineExceeded, message)
}

pub fn resource_exhausted(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::ResourceExhausted, message)
}

pub fn failed_precondition(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::FailedPrecondition, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_failures() {
        assert_eq!(transport_error("reset").kind(), FailureKind::Transport);
        assert_eq!(malformed_response("bad json").kind(), FailureKind::MalformedResponse);
        assert_eq!(invalid_argument("nope").kind(), FailureKind::InvalidArgument);
        let status = permission_denied("denied").with_http_status(403);
        assert_eq!(status.kind(), FailureKind::Status);
        assert_eq!(status.http_status(), Some(403));
    }

    #[test]
    fn display_includes_code_and_status() {
        let err = not_found("missing").with_http_status(404);
        assert_eq!(err.to_string(), "missing (firestore/not-found, HTTP 404)");
    }
}
