use serde_json::Value;
use thiserror::Error;

use crate::model::ProcessId;

/// Failures of the backing key-value store. Fatal to the stage that hit them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Input validation failures inside the upstream client.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("city ids must be strings, got: {0:?}")]
    NonStringIdentifier(Vec<Value>),

    #[error("missing field `{field}` in upstream record: {record}")]
    MissingField { field: &'static str, record: Value },
}

/// Why a single batch produced no observations.
///
/// Returned as a value; the orchestrator absorbs it and keeps scheduling.
#[derive(Debug, Error)]
pub enum BatchFailure {
    #[error("request wasn't successful. Status code: {status} Message: {message}")]
    Status { status: u16, message: String },

    #[error("timeout error occurred: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Invalid(#[from] ProviderError),
}

/// Errors surfaced by the pipeline stages.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("{message}")]
    NotFound {
        process_id: ProcessId,
        message: &'static str,
    },

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl ProcessError {
    pub fn outcome(&self) -> Outcome {
        match self {
            ProcessError::NotFound { .. } => Outcome::NotFound,
            ProcessError::Store(_) => Outcome::InternalError,
        }
    }

    /// Message safe to hand to an external caller; internal detail stays in the log.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProcessError::NotFound { message, .. } => message,
            ProcessError::Store(_) => INTERNAL_ERROR_MESSAGE,
        }
    }
}

pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred.";
pub const REQUEST_TIMEOUT_MESSAGE: &str = "Request timeout";

/// How a failed stage presents to its caller. Timeouts are decided at the
/// request boundary and never come out of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NotFound,
    InternalError,
}
