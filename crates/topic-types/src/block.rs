//! Similarity blocks: materialized near-duplicate pairs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::topic::TopicId;

/// An unordered pair of topics whose embeddings are close enough to be
/// treated as duplicates for selection.
///
/// The pair is normalized so `topic_a < topic_b`; both orderings of the same
/// two topics produce the same block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityBlock {
    pub topic_a: TopicId,
    pub topic_b: TopicId,
    pub category: Category,
    /// Cosine similarity, clamped to [0, 1]
    pub score: f32,
    /// Threshold in force when the block was computed
    pub threshold: f32,
    pub computed_at: DateTime<Utc>,
}

impl SimilarityBlock {
    /// Create a block for two topics, normalizing the pair order.
    pub fn new(
        first: &str,
        second: &str,
        category: Category,
        score: f32,
        threshold: f32,
        computed_at: DateTime<Utc>,
    ) -> Self {
        let (topic_a, topic_b) = Self::normalize_pair(first, second);
        Self {
            topic_a,
            topic_b,
            category,
            score: score.clamp(0.0, 1.0),
            threshold,
            computed_at,
        }
    }

    /// Order two ids so the pair has a single canonical form.
    pub fn normalize_pair(first: &str, second: &str) -> (TopicId, TopicId) {
        if first <= second {
            (first.to_string(), second.to_string())
        } else {
            (second.to_string(), first.to_string())
        }
    }

    /// True if `topic_id` is one side of the pair.
    pub fn involves(&self, topic_id: &str) -> bool {
        self.topic_a == topic_id || self.topic_b == topic_id
    }

    /// The other side of the pair, if `topic_id` is one side.
    pub fn other(&self, topic_id: &str) -> Option<&str> {
        if self.topic_a == topic_id {
            Some(&self.topic_b)
        } else if self.topic_b == topic_id {
            Some(&self.topic_a)
        } else {
            None
        }
    }
}
