//! Category statistics read-models.
//!
//! Always computed by aggregation at read time, never stored.

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::topic::{Topic, TopicId};
use crate::usage::UsageHistoryEntry;

/// Compact view of a topic for most-used listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicUsageSummary {
    pub topic_id: TopicId,
    pub text: String,
    pub times_used: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&Topic> for TopicUsageSummary {
    fn from(topic: &Topic) -> Self {
        Self {
            topic_id: topic.topic_id.clone(),
            text: topic.text.clone(),
            times_used: topic.times_used,
            last_used_at: topic.last_used_at,
        }
    }
}

/// Aggregate view of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: Category,
    /// Every topic in the category, approved or not
    pub total: usize,
    /// Approved and currently selectable
    pub available: usize,
    /// Approved and used within the cooldown window
    pub used: usize,
    /// Approved, not recently used, but similar to a recently used topic
    pub blocked: usize,
    /// Proposed topics awaiting approval
    pub pending_approval: usize,
    pub most_used: Vec<TopicUsageSummary>,
    /// Successful attempts / attempts over the trailing window
    pub success_rate: Option<f64>,
    pub attempts_in_window: usize,
    pub window_days: u32,
    /// Latest history rows, newest first
    pub recent_usage: Vec<UsageHistoryEntry>,
}

impl CategoryStats {
    /// Empty statistics for a category.
    pub fn empty(category: Category, window_days: u32) -> Self {
        Self {
            category,
            total: 0,
            available: 0,
            used: 0,
            blocked: 0,
            pending_approval: 0,
            most_used: Vec::new(),
            success_rate: None,
            attempts_in_window: 0,
            window_days,
            recent_usage: Vec::new(),
        }
    }
}
