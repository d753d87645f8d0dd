//! Error types for the job service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::queue::{JobStatus, JobType};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown job type: {0}")]
    UnknownJobType(String),

    #[error("No handler registered for job type: {0}")]
    HandlerNotRegistered(JobType),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Job {id} cannot be {action} while {status}")]
    InvalidTransition {
        id: Uuid,
        status: JobStatus,
        action: &'static str,
    },

    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),

    #[error("Handler failed: {0}")]
    Handler(String),

    #[error("Handler timed out after {0:?}")]
    HandlerTimeout(Duration),

    #[error("Handler panicked: {0}")]
    HandlerPanic(String),

    #[error("Job queue error: {0}")]
    JobQueue(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Configuration errors are never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownJobType(_) | Error::HandlerNotRegistered(_)
        )
    }

    /// Stable machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::UnknownJobType(_) | Error::HandlerNotRegistered(_) => "configuration_error",
            Error::Validation(_) | Error::InvalidPayload(_) => "validation_error",
            Error::JobNotFound(_) | Error::DocumentNotFound(_) => "not_found",
            Error::InvalidTransition { .. } => "conflict",
            Error::Handler(_) | Error::HandlerTimeout(_) | Error::HandlerPanic(_) => {
                "handler_error"
            }
            Error::JobQueue(_) | Error::Internal(_) | Error::Other(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidPayload(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::UnknownJobType(_)
            | Error::HandlerNotRegistered(_)
            | Error::Validation(_)
            | Error::InvalidPayload(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::JobNotFound(_) | Error::DocumentNotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            Error::InvalidTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            Error::Handler(_)
            | Error::HandlerTimeout(_)
            | Error::HandlerPanic(_)
            | Error::JobQueue(_)
            | Error::Internal(_)
            | Error::Other(_) => {
                tracing::error!(error = %self, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": self.code(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_flagged() {
        assert!(Error::UnknownJobType("bogus".into()).is_configuration());
        assert!(Error::HandlerNotRegistered(JobType::LinkCheck).is_configuration());
        assert!(!Error::Handler("boom".into()).is_configuration());
        assert!(!Error::HandlerTimeout(Duration::from_secs(1)).is_configuration());
    }

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (Error::UnknownJobType("bogus".into()), StatusCode::BAD_REQUEST),
            (Error::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (Error::JobNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (Error::DocumentNotFound("article/a1".into()), StatusCode::NOT_FOUND),
            (Error::JobQueue("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
