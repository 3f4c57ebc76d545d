//! # topic-embeddings
//!
//! Embedding generation for topic texts.
//!
//! The engine only depends on the [`EmbeddingProvider`] trait. Two
//! implementations ship here:
//! - [`ApiEmbedder`]: OpenAI-compatible `/embeddings` endpoint
//! - [`StaticEmbedder`]: deterministic in-process vectors for tests and demos

pub mod api;
pub mod error;
pub mod mock;
pub mod model;

pub use api::{ApiEmbedder, ApiEmbedderConfig};
pub use error::EmbeddingError;
pub use mock::StaticEmbedder;
pub use model::{Embedding, EmbeddingProvider, ModelInfo};
