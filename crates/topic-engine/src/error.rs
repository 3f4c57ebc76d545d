//! Engine error types.

use std::fmt;

use thiserror::Error;
use topic_types::TypesError;

/// External collaborator that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalService {
    Embedding,
    Generator,
}

impl fmt::Display for ExternalService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalService::Embedding => write!(f, "embedding"),
            ExternalService::Generator => write!(f, "generator"),
        }
    }
}

/// Errors that can occur during engine operations.
///
/// "No eligible topic" is not an error; see `Selection::NotAvailable`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Rejected input, raised before any store access
    #[error("Invalid {parameter}: {message}")]
    Validation { parameter: String, message: String },

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] topic_storage::StorageError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Topic not found
    #[error("Topic not found: {0}")]
    NotFound(String),

    /// Topic text already present in the category
    #[error("Duplicate topic: {0}")]
    Duplicate(String),

    /// External service failed
    #[error("{service} service error: {message}")]
    ExternalService {
        service: ExternalService,
        message: String,
    },

    /// External service did not answer in time
    #[error("{service} service timed out after {seconds}s")]
    Timeout {
        service: ExternalService,
        seconds: u64,
    },

    /// Automatic generation is switched off
    #[error("Automatic topic generation is disabled")]
    Disabled,
}

impl EngineError {
    /// Build a validation error for a named parameter.
    pub fn validation(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    pub(crate) fn external(service: ExternalService, message: impl ToString) -> Self {
        Self::ExternalService {
            service,
            message: message.to_string(),
        }
    }
}

impl From<TypesError> for EngineError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::InvalidValue { parameter, message } => {
                EngineError::Validation { parameter, message }
            }
            TypesError::Config(message) => EngineError::Validation {
                parameter: "config".to_string(),
                message,
            },
            TypesError::Serialization(e) => EngineError::Serialization(e),
        }
    }
}
