//! End-to-end test infrastructure for the topic engine.
//!
//! Provides a shared TestHarness wiring a real RocksDB store to the
//! deterministic embedder and generator, plus helpers for seeding topics
//! with controlled embeddings and usage.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use topic_embeddings::{EmbeddingProvider, StaticEmbedder};
use topic_engine::{MockTopicGenerator, TopicEngine, TopicGenerator, TopicStorage};
use topic_storage::Storage;
use topic_types::{Category, EngineConfig, Topic, TopicSource, UsageOutcome};

/// Embedding dimension used by the harness.
pub const DIM: usize = 16;

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Topic storage shared with the engine
    pub topics: Arc<TopicStorage>,
    pub engine: TopicEngine,
}

impl TestHarness {
    /// Harness with a bag-of-words embedder and a generator that proposes nothing.
    pub fn new() -> Self {
        Self::with_services(StaticEmbedder::new(DIM), MockTopicGenerator::default())
    }

    /// Harness with the given embedder and generator.
    pub fn with_services<E, G>(embedder: E, generator: G) -> Self
    where
        E: EmbeddingProvider + 'static,
        G: TopicGenerator + 'static,
    {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let engine = open_engine(temp_dir.path(), Arc::new(embedder), Arc::new(generator));
        let topics = engine.storage().clone();
        Self {
            _temp_dir: temp_dir,
            topics,
            engine,
        }
    }

    /// Insert an approved or pending topic with a fixed embedding and index it.
    pub fn seed_topic(
        &self,
        category: Category,
        text: &str,
        embedding: Vec<f32>,
        approved: bool,
    ) -> Topic {
        let topic = Topic::new(category, text, embedding, approved, TopicSource::Manual);
        self.topics
            .insert_topic(&topic)
            .expect("Failed to insert topic");
        self.engine
            .index_topic(&topic.topic_id, None)
            .expect("Failed to index topic");
        topic
    }

    /// Insert an approved topic and record one successful use at `used_at`.
    pub fn seed_used_topic(
        &self,
        category: Category,
        text: &str,
        embedding: Vec<f32>,
        used_at: DateTime<Utc>,
    ) -> Topic {
        let topic = self.seed_topic(category, text, embedding, true);
        self.engine
            .record_usage_at(&topic.topic_id, &UsageOutcome::succeeded(), used_at)
            .expect("Failed to record usage");
        self.reload(&topic.topic_id)
    }

    /// Fetch the current stored copy of a topic.
    pub fn reload(&self, topic_id: &str) -> Topic {
        self.topics
            .get_topic(topic_id)
            .expect("Failed to read topic")
            .expect("Topic missing")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Open storage at `path` and build an engine with default configuration.
pub fn open_engine(
    path: &Path,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn TopicGenerator>,
) -> TopicEngine {
    let storage = Arc::new(Storage::open(path).expect("Failed to open test storage"));
    TopicEngine::new(
        Arc::new(TopicStorage::new(storage)),
        embedder,
        generator,
        EngineConfig::default(),
    )
    .expect("Failed to create engine")
}

/// Unit vector along axis `i` of the harness dimension.
pub fn axis(i: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[i % DIM] = 1.0;
    v
}

/// Unit vector in the plane of axes 0 and 1 at `degrees` from axis 0.
///
/// Two such vectors have cosine similarity `cos(a - b)`.
pub fn planar(degrees: f32) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    let radians = degrees.to_radians();
    v[0] = radians.cos();
    v[1] = radians.sin();
    v
}

/// Vector with cosine similarity `similarity` to `axis(i)`, leaning on `axis(j)`.
pub fn near_axis(i: usize, j: usize, similarity: f32) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[i % DIM] = similarity;
    v[j % DIM] = (1.0 - similarity * similarity).sqrt();
    v
}
