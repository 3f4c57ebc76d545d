//! Topic generation.
//!
//! Proposes new topic texts for a category through an external text
//! generation service.

mod api;
mod mock;

pub use api::{ApiTopicGenerator, ApiTopicGeneratorConfig, GeneratorProvider};
pub use mock::MockTopicGenerator;

use async_trait::async_trait;
use thiserror::Error;
use topic_types::Category;

/// Errors from topic generation.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Trait for topic generation implementations.
#[async_trait]
pub trait TopicGenerator: Send + Sync {
    /// Propose up to `count` raw topic texts for `category`.
    ///
    /// Output is untrusted; callers normalize and deduplicate it.
    async fn propose(
        &self,
        category: Category,
        count: usize,
    ) -> Result<Vec<String>, GeneratorError>;
}
