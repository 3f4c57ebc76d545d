//! Error types for shared domain values.

use thiserror::Error;

/// Errors raised while building or loading domain values.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A value was rejected; names the offending parameter
    #[error("Invalid {parameter}: {message}")]
    InvalidValue { parameter: String, message: String },
}

impl TypesError {
    /// Build an `InvalidValue` error for a named parameter.
    pub fn invalid(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}
