//! Usage history types.
//!
//! History is append-only: one entry per generation attempt, never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::category::Category;
use crate::topic::TopicId;

/// Outcome reported by the content generator after using a topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageOutcome {
    /// Identifier of the generated content, when one was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    /// Wall-clock generation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl UsageOutcome {
    /// A successful generation.
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// A failed generation with an error message.
    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(error_message.into()),
            ..Default::default()
        }
    }

    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// One row of the usage audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageHistoryEntry {
    /// Unique identifier (ULID)
    pub entry_id: String,
    pub topic_id: TopicId,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl UsageHistoryEntry {
    /// Build an entry for an outcome recorded at `now`.
    pub fn from_outcome(
        topic_id: impl Into<TopicId>,
        category: Category,
        outcome: &UsageOutcome,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            entry_id: Ulid::new().to_string(),
            topic_id: topic_id.into(),
            category,
            content_id: outcome.content_id.clone(),
            success: outcome.success,
            error_message: outcome.error_message.clone(),
            duration_ms: outcome.duration_ms,
            created_at: now,
        }
    }

    /// Milliseconds since epoch, used for time-ordered keys.
    pub fn timestamp_ms(&self) -> i64 {
        self.created_at.timestamp_millis()
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
