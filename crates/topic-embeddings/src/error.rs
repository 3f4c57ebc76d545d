//! Embedding error types.

use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Request to the embedding service failed
    #[error("API request failed: {0}")]
    Api(String),

    /// Response could not be parsed
    #[error("Failed to parse API response: {0}")]
    Parse(String),

    /// Rate limited by the provider
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
