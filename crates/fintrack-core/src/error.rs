use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use fintrack_domain::{DateRangeError, ParseLabelError};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("Budget sync failed after expense {expense_id} was saved: {reason}")]
    SyncFailed { expense_id: Uuid, reason: String },
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::ValidationFailure,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::Storage(_)
            | CoreError::Io(_)
            | CoreError::Serde(_)
            | CoreError::SyncFailed { .. } => ErrorKind::InternalFailure,
        }
    }
}

impl From<ParseLabelError> for CoreError {
    fn from(err: ParseLabelError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

impl From<DateRangeError> for CoreError {
    fn from(err: DateRangeError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Coarse error classes exposed to route handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationFailure,
    NotFound,
    Conflict,
    InternalFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::ValidationFailure => "ValidationFailure",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::InternalFailure => "InternalFailure",
        };
        f.write_str(label)
    }
}

const INTERNAL_FAILURE_MESSAGE: &str = "Internal server error";

/// Structured, user-visible form of a [`CoreError`].
///
/// Internal failures carry a generic message; storage detail stays in the logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&CoreError> for ErrorResponse {
    fn from(err: &CoreError) -> Self {
        let kind = err.kind();
        let message = match kind {
            ErrorKind::InternalFailure => INTERNAL_FAILURE_MESSAGE.to_string(),
            _ => err.to_string(),
        };
        Self { kind, message }
    }
}

impl From<CoreError> for ErrorResponse {
    fn from(err: CoreError) -> Self {
        ErrorResponse::from(&err)
    }
}

/// Failure reported by a notification channel. Never surfaces past the engine.
#[derive(Debug, Error)]
#[error("notification to {recipient} failed: {reason}")]
pub struct DispatchError {
    pub recipient: String,
    pub reason: String,
}
