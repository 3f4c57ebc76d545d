//! Topic selection.
//!
//! Picks the next topic for a category: approved, outside the cooldown
//! window, not a near-duplicate of anything used inside it, least recently
//! used first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use topic_types::{Category, CategoryStats, EngineConfig, Topic};
use tracing::{info, instrument};

use crate::eligibility::{CategorySnapshot, SelectionParams};
use crate::error::EngineError;
use crate::stats::StatsAggregator;
use crate::storage::TopicStorage;

/// Step added to the threshold when suggesting a looser similarity gate.
const THRESHOLD_RELAX_STEP: f32 = 0.05;

/// Selection request. Unset parameters fall back to configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub category: String,
    #[serde(default)]
    pub similarity_threshold: Option<f32>,
    #[serde(default)]
    pub cooldown_days: Option<i64>,
}

impl SelectionRequest {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    pub fn with_cooldown_days(mut self, days: i64) -> Self {
        self.cooldown_days = Some(days);
        self
    }
}

/// Outcome of a selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Selection {
    Selected(Topic),
    NotAvailable(NotAvailable),
}

impl Selection {
    pub fn topic(&self) -> Option<&Topic> {
        match self {
            Selection::Selected(topic) => Some(topic),
            Selection::NotAvailable(_) => None,
        }
    }
}

/// Returned when no topic in the category is eligible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotAvailable {
    pub category: Category,
    pub similarity_threshold: f32,
    pub cooldown_days: u32,
    pub stats: CategoryStats,
    pub suggestions: Vec<Suggestion>,
}

/// Operator action that would make a topic eligible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Suggestion {
    /// Raise the threshold so fewer pairs count as near-duplicates
    RelaxSimilarityThreshold { current: f32, suggested: f32 },
    ShortenCooldown { current_days: u32, suggested_days: u32 },
    ApprovePendingTopics { count: usize },
    AddTopics { category: Category },
}

/// Selects topics from storage.
pub struct TopicSelector<'a> {
    storage: &'a TopicStorage,
    config: &'a EngineConfig,
}

impl<'a> TopicSelector<'a> {
    pub fn new(storage: &'a TopicStorage, config: &'a EngineConfig) -> Self {
        Self { storage, config }
    }

    /// Resolve and validate request parameters before touching the store.
    pub fn resolve(
        &self,
        request: &SelectionRequest,
    ) -> Result<(Category, SelectionParams), EngineError> {
        let category: Category = request.category.parse()?;
        let params = SelectionParams::new(
            request
                .similarity_threshold
                .unwrap_or(self.config.selection.similarity_threshold),
            request
                .cooldown_days
                .unwrap_or(i64::from(self.config.selection.cooldown_days)),
        )?;
        Ok((category, params))
    }

    /// Select the next topic.
    pub fn select(&self, request: &SelectionRequest) -> Result<Selection, EngineError> {
        self.select_at(request, Utc::now())
    }

    /// Select the next topic as of `now`.
    #[instrument(skip(self, request), fields(category = %request.category))]
    pub fn select_at(
        &self,
        request: &SelectionRequest,
        now: DateTime<Utc>,
    ) -> Result<Selection, EngineError> {
        let (category, params) = self.resolve(request)?;
        let snapshot = CategorySnapshot::load(self.storage, category, params, now)?;

        if let Some(topic) = snapshot.candidates().first() {
            info!(topic_id = %topic.topic_id, times_used = topic.times_used, "Selected topic");
            return Ok(Selection::Selected((*topic).clone()));
        }

        let stats =
            StatsAggregator::new(self.storage, &self.config.stats).from_snapshot(&snapshot, now)?;
        let suggestions = suggestions_for(&snapshot);
        info!(
            total = stats.total,
            used = stats.used,
            blocked = stats.blocked,
            pending = stats.pending_approval,
            "No topic available"
        );

        Ok(Selection::NotAvailable(NotAvailable {
            category,
            similarity_threshold: params.similarity_threshold,
            cooldown_days: params.cooldown_days,
            stats,
            suggestions,
        }))
    }
}

fn suggestions_for(snapshot: &CategorySnapshot) -> Vec<Suggestion> {
    let params = snapshot.params;
    let mut suggestions = Vec::new();

    if snapshot.similarity_blocked() > 0 && params.similarity_threshold < 1.0 {
        suggestions.push(Suggestion::RelaxSimilarityThreshold {
            current: params.similarity_threshold,
            suggested: (params.similarity_threshold + THRESHOLD_RELAX_STEP).min(1.0),
        });
    }
    if snapshot.cooling_down() > 0 && params.cooldown_days > 0 {
        suggestions.push(Suggestion::ShortenCooldown {
            current_days: params.cooldown_days,
            suggested_days: params.cooldown_days / 2,
        });
    }
    let pending = snapshot.pending_approval();
    if pending > 0 {
        suggestions.push(Suggestion::ApprovePendingTopics { count: pending });
    }
    suggestions.push(Suggestion::AddTopics {
        category: snapshot.category,
    });
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;
    use tempfile::TempDir;
    use topic_storage::Storage;
    use topic_types::TopicSource;

    fn create_test_storage() -> (TopicStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (TopicStorage::new(Arc::new(storage)), temp_dir)
    }

    fn insert(storage: &TopicStorage, text: &str, embedding: Vec<f32>, approved: bool) -> Topic {
        let t = Topic::new(
            Category::WebDevelopment,
            text,
            embedding,
            approved,
            TopicSource::Manual,
        );
        storage.insert_topic(&t).unwrap();
        t
    }

    #[test]
    fn test_invalid_category_is_validation_error() {
        let (storage, _temp) = create_test_storage();
        let config = EngineConfig::default();
        let result =
            TopicSelector::new(&storage, &config).select(&SelectionRequest::new("cooking"));
        match result {
            Err(EngineError::Validation { parameter, .. }) => assert_eq!(parameter, "category"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_selects_fresh_topic() {
        let (storage, _temp) = create_test_storage();
        let config = EngineConfig::default();
        let t = insert(&storage, "Edge caching for SSR", vec![1.0, 0.0], true);

        let selection = TopicSelector::new(&storage, &config)
            .select(&SelectionRequest::new("web-development"))
            .unwrap();
        assert_eq!(selection.topic().map(|t| t.topic_id.clone()), Some(t.topic_id));
    }

    #[test]
    fn test_huge_cooldown_returns_result() {
        let (storage, _temp) = create_test_storage();
        let config = EngineConfig::default();
        let now = Utc::now();
        let used = insert(&storage, "used", vec![1.0, 0.0], true);
        storage
            .update_topic(&used.topic_id, |t| t.mark_used(now - Duration::days(4000)))
            .unwrap();
        let fresh = insert(&storage, "fresh", vec![0.0, 1.0], true);

        let request = SelectionRequest::new("web-development").with_cooldown_days(200_000_000);
        let selection = TopicSelector::new(&storage, &config)
            .select_at(&request, now)
            .unwrap();
        assert_eq!(selection.topic().map(|t| t.topic_id.clone()), Some(fresh.topic_id));
    }

    #[test]
    fn test_selection_is_read_only() {
        let (storage, _temp) = create_test_storage();
        let config = EngineConfig::default();
        let t = insert(&storage, "Edge caching for SSR", vec![1.0, 0.0], true);
        let selector = TopicSelector::new(&storage, &config);

        selector.select(&SelectionRequest::new("web-development")).unwrap();
        selector.select(&SelectionRequest::new("web-development")).unwrap();
        assert_eq!(storage.get_topic(&t.topic_id).unwrap().unwrap(), t);
    }

    #[test]
    fn test_not_available_suggestions() {
        let (storage, _temp) = create_test_storage();
        let config = EngineConfig::default();
        let now = Utc::now();

        let used = insert(&storage, "used", vec![1.0, 0.0], true);
        storage
            .update_topic(&used.topic_id, |t| t.mark_used(now - Duration::days(3)))
            .unwrap();
        insert(&storage, "near", vec![0.98, 0.1], true);
        insert(&storage, "proposal", vec![0.0, 1.0], false);

        let selection = TopicSelector::new(&storage, &config)
            .select_at(&SelectionRequest::new("web-development"), now)
            .unwrap();
        let Selection::NotAvailable(info) = selection else {
            panic!("expected NotAvailable");
        };

        assert_eq!(info.category, Category::WebDevelopment);
        assert_eq!(info.cooldown_days, 90);
        assert_eq!(info.stats.total, 3);
        assert!(info.suggestions.contains(&Suggestion::ShortenCooldown {
            current_days: 90,
            suggested_days: 45
        }));
        assert!(info
            .suggestions
            .iter()
            .any(|s| matches!(s, Suggestion::RelaxSimilarityThreshold { .. })));
        assert!(info
            .suggestions
            .contains(&Suggestion::ApprovePendingTopics { count: 1 }));
        assert_eq!(
            info.suggestions.last(),
            Some(&Suggestion::AddTopics {
                category: Category::WebDevelopment
            })
        );
    }

    #[test]
    fn test_request_overrides_config() {
        let (storage, _temp) = create_test_storage();
        let config = EngineConfig::default();
        let now = Utc::now();

        let used = insert(&storage, "used", vec![1.0, 0.0], true);
        storage
            .update_topic(&used.topic_id, |t| t.mark_used(now - Duration::days(10)))
            .unwrap();

        let selector = TopicSelector::new(&storage, &config);
        let blocked = selector
            .select_at(&SelectionRequest::new("web-development"), now)
            .unwrap();
        assert!(blocked.topic().is_none());

        let shorter = selector
            .select_at(
                &SelectionRequest::new("web-development").with_cooldown_days(7),
                now,
            )
            .unwrap();
        assert_eq!(shorter.topic().map(|t| t.topic_id.clone()), Some(used.topic_id));
    }
}
