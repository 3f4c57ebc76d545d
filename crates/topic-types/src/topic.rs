//! Topic data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::category::Category;

/// A unique identifier for a topic (ULID string).
pub type TopicId = String;

/// A curated blog topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// Unique identifier (ULID)
    pub topic_id: TopicId,
    /// Human-readable topic text
    pub text: String,
    /// Content category
    pub category: Category,
    /// Advisory status, recomputed on every write
    pub status: TopicStatus,
    /// Embedding of `text`; empty until computed
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Successful uses
    pub times_used: u32,
    /// Most recent successful use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    /// Only approved topics are selectable
    pub approved: bool,
    /// How the topic entered the pool
    pub source: TopicSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Topic {
    /// Create a new, never-used topic.
    pub fn new(
        category: Category,
        text: impl Into<String>,
        embedding: Vec<f32>,
        approved: bool,
        source: TopicSource,
    ) -> Self {
        Self::new_at(category, text, embedding, approved, source, Utc::now())
    }

    /// Create a new topic with an explicit creation time.
    pub fn new_at(
        category: Category,
        text: impl Into<String>,
        embedding: Vec<f32>,
        approved: bool,
        source: TopicSource,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            topic_id: Ulid::new().to_string(),
            text: text.into(),
            category,
            status: TopicStatus::Available,
            embedding,
            times_used: 0,
            last_used_at: None,
            approved,
            source,
            created_at: now,
            updated_at: now,
        }
    }

    /// True if the topic was successfully used after `cutoff`.
    pub fn used_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_used_at.is_some_and(|at| at > cutoff)
    }

    /// True if the topic has never been used.
    pub fn is_fresh(&self) -> bool {
        self.times_used == 0
    }

    /// True once an embedding has been computed.
    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }

    /// Apply a successful use at `now`.
    ///
    /// `last_used_at` never moves backwards.
    pub fn mark_used(&mut self, now: DateTime<Utc>) {
        self.times_used = self.times_used.saturating_add(1);
        self.last_used_at = Some(match self.last_used_at {
            Some(previous) if previous > now => previous,
            _ => now,
        });
        self.status = TopicStatus::Used;
        self.updated_at = now;
    }
}

/// Advisory topic status.
///
/// The real gates are `last_used_at`, `approved` and similarity blocks; this
/// is a cached read-model refreshed on write.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    Available,
    Used,
    Blocked,
}

impl std::fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopicStatus::Available => write!(f, "available"),
            TopicStatus::Used => write!(f, "used"),
            TopicStatus::Blocked => write!(f, "blocked"),
        }
    }
}

/// Origin of a topic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TopicSource {
    /// Entered by an operator
    Manual,
    /// Proposed by the text generation service
    Generated,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn topic() -> Topic {
        Topic::new(
            Category::WebDevelopment,
            "Shipping a Rust API on a budget",
            vec![0.1, 0.2],
            true,
            TopicSource::Manual,
        )
    }

    #[test]
    fn test_topic_new() {
        let topic = topic();
        assert!(topic.is_fresh());
        assert!(topic.last_used_at.is_none());
        assert_eq!(topic.status, TopicStatus::Available);
        assert_eq!(topic.topic_id.len(), 26);
    }

    #[test]
    fn test_mark_used_increments_and_stamps() {
        let mut topic = topic();
        let now = Utc::now();
        topic.mark_used(now);
        assert_eq!(topic.times_used, 1);
        assert_eq!(topic.last_used_at, Some(now));
        assert_eq!(topic.status, TopicStatus::Used);
    }

    #[test]
    fn test_mark_used_never_moves_backwards() {
        let mut topic = topic();
        let now = Utc::now();
        topic.mark_used(now);
        topic.mark_used(now - Duration::days(3));
        assert_eq!(topic.times_used, 2);
        assert_eq!(topic.last_used_at, Some(now));
    }

    #[test]
    fn test_used_since() {
        let mut topic = topic();
        let now = Utc::now();
        assert!(!topic.used_since(now - Duration::days(90)));
        topic.mark_used(now - Duration::days(10));
        assert!(topic.used_since(now - Duration::days(90)));
        assert!(!topic.used_since(now - Duration::days(5)));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TopicStatus::Blocked.to_string(), "blocked");
    }
}
