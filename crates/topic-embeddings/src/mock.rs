//! Deterministic embedder for testing.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingProvider, ModelInfo};

/// Embedder that returns fixed vectors for known texts and a hashed
/// bag-of-words vector for everything else.
///
/// Texts can be configured to fail, either always or a fixed number of times,
/// to exercise retry and skip paths.
pub struct StaticEmbedder {
    info: ModelInfo,
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
    always_fail: Vec<String>,
    failures_left: Mutex<HashMap<String, u32>>,
    calls: AtomicUsize,
}

impl StaticEmbedder {
    /// Create an embedder producing vectors of `dimension` floats.
    pub fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo {
                name: "static-bag-of-words".to_string(),
                dimension: Some(dimension),
            },
            dimension,
            vectors: HashMap::new(),
            always_fail: Vec::new(),
            failures_left: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Return `vector` whenever `text` is embedded.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    /// Fail every call for `text`.
    pub fn failing_on(mut self, text: impl Into<String>) -> Self {
        self.always_fail.push(text.into());
        self
    }

    /// Fail the first `times` calls for `text`, then succeed.
    pub fn failing_times(self, text: impl Into<String>, times: u32) -> Self {
        if let Ok(mut left) = self.failures_left.lock() {
            left.insert(text.into(), times);
        }
        self
    }

    /// Number of `embed` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hashed_vector(&self, text: &str) -> Vec<f32> {
        let mut values = vec![0.0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            values[bucket] += 1.0;
        }
        values
    }

    fn should_fail(&self, text: &str) -> bool {
        if self.always_fail.iter().any(|t| t == text) {
            return true;
        }
        match self.failures_left.lock() {
            Ok(mut left) => match left.get_mut(text) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            },
            Err(_) => false,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.should_fail(text) {
            return Err(EmbeddingError::Api(format!("simulated failure for '{}'", text)));
        }

        if let Some(vector) = self.vectors.get(text) {
            if vector.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
            return Ok(Embedding::new(vector.clone()));
        }

        Ok(Embedding::new(self.hashed_vector(text)))
    }
}
