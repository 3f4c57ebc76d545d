//! # topic-types
//!
//! Shared domain types for the topic rotation engine.
//!
//! This crate defines the data structures used throughout the workspace:
//! - Topics: curated blog topics with embeddings and usage metadata
//! - Usage history: append-only record of every generation attempt
//! - Similarity blocks: near-duplicate pairs materialized above a threshold
//! - Category statistics: read-side aggregates for operators
//! - Settings: layered configuration

pub mod block;
pub mod category;
pub mod config;
pub mod error;
pub mod stats;
pub mod topic;
pub mod usage;

pub use block::SimilarityBlock;
pub use category::Category;
pub use config::{
    EmbeddingSettings, EngineConfig, ExpansionConfig, ExternalCallConfig, GeneratorSettings,
    SelectionConfig, Settings, SimilarityConfig, StatsConfig,
};
pub use error::TypesError;
pub use stats::{CategoryStats, TopicUsageSummary};
pub use topic::{Topic, TopicId, TopicSource, TopicStatus};
pub use usage::{UsageHistoryEntry, UsageOutcome};
