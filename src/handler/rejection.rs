use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

/// Reasons an upload is turned away. Every variant maps to a plain-text reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("invalid path")]
    InvalidPath,

    #[error("unknown class")]
    UnknownClass,

    #[error("invalid user")]
    InvalidUser,

    #[error("missing client identity")]
    MissingIdentity,

    #[error("client identity ({received}) != expected ({expected})")]
    IdentityMismatch { received: String, expected: String },

    #[error("failed parsing upload form: {0}")]
    Form(String),

    #[error("failed retrieving upload file: no \"file\" field in form")]
    MissingFile,

    #[error("failed reading upload file: {0}")]
    Upload(String),

    #[error("shutting down")]
    QueueClosed,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("not found")]
    NotFound,
}

impl IngestError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
            IngestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            IngestError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        warn!(status = status.as_u16(), reason = %message, "Request rejected");
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn validation_failures_are_bad_requests() {
        for err in [
            IngestError::InvalidPath,
            IngestError::UnknownClass,
            IngestError::InvalidUser,
            IngestError::MissingIdentity,
            IngestError::MissingFile,
            IngestError::Form("boundary".into()),
            IngestError::Upload("length limit exceeded".into()),
        ] {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{err}");
        }
    }

    #[test]
    fn routing_failures_keep_their_status() {
        assert_eq!(IngestError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(IngestError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(IngestError::QueueClosed.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn mismatch_message_quotes_both_values() {
        let err = IngestError::IdentityMismatch {
            received: "CN=mallory".into(),
            expected: "CN=bob".into(),
        };
        assert_eq!(err.to_string(), "client identity (CN=mallory) != expected (CN=bob)");
    }

    #[test]
    fn into_response_sets_status() {
        let response = IngestError::UnknownClass.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[traced_test]
    #[test]
    fn rejection_is_logged_with_reason() {
        let _ = IngestError::UnknownClass.into_response();
        assert!(logs_contain("Request rejected"));
        assert!(logs_contain("unknown class"));
    }
}
