use thiserror::Error;

use fintrack_config::ConfigError;
use fintrack_core::{CoreError, ErrorKind, ErrorResponse};

/// Error type surfaced by the [`FinanceTracker`](crate::FinanceTracker) facade.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl TrackerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::Core(err) => err.kind(),
            TrackerError::Config(_) => ErrorKind::InternalFailure,
        }
    }

    /// Caller-facing form; internal detail stays in the logs.
    pub fn response(&self) -> ErrorResponse {
        match self {
            TrackerError::Core(err) => ErrorResponse::from(err),
            TrackerError::Config(_) => ErrorResponse {
                kind: ErrorKind::InternalFailure,
                message: "Internal server error".into(),
            },
        }
    }
}
