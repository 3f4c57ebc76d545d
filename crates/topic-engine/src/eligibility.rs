//! Topic eligibility under a cooldown window and similarity threshold.
//!
//! The selector, the stats aggregator and the status refresh all classify
//! topics the same way, so the logic lives here once.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use topic_types::{Category, SimilarityBlock, Topic, TopicStatus};
use tracing::debug;

use crate::error::EngineError;
use crate::similarity::topic_similarity;
use crate::storage::TopicStorage;

/// Validated selection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionParams {
    pub similarity_threshold: f32,
    pub cooldown_days: u32,
}

impl SelectionParams {
    /// Validate raw parameters, naming the offending one on failure.
    pub fn new(similarity_threshold: f32, cooldown_days: i64) -> Result<Self, EngineError> {
        if !(similarity_threshold > 0.0 && similarity_threshold <= 1.0) {
            return Err(EngineError::validation(
                "similarity_threshold",
                format!("must be in (0, 1], got {}", similarity_threshold),
            ));
        }
        if cooldown_days < 0 {
            return Err(EngineError::validation(
                "cooldown_days",
                format!("must be >= 0, got {}", cooldown_days),
            ));
        }
        let cooldown_days = u32::try_from(cooldown_days).map_err(|_| {
            EngineError::validation("cooldown_days", format!("too large: {}", cooldown_days))
        })?;
        Ok(Self {
            similarity_threshold,
            cooldown_days,
        })
    }

    /// Start of the cooldown window. `None` when the gate is disabled.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.cooldown_days == 0 {
            None
        } else {
            Some(days_before(now, self.cooldown_days))
        }
    }
}

/// `now` minus `days`, saturating at the earliest representable instant.
pub fn days_before(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(days))
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Why a topic can or cannot be selected right now.
#[derive(Debug, Clone, PartialEq)]
pub enum Eligibility {
    Available,
    /// Used inside the cooldown window
    CoolingDown,
    /// Near-duplicate of a topic used inside the cooldown window
    SimilarToRecent { recent_topic_id: String, score: f32 },
    /// Not approved (proposed or retired)
    PendingApproval,
}

impl Eligibility {
    /// Advisory status for a topic in this state.
    pub fn status_for(&self, topic: &Topic) -> TopicStatus {
        match self {
            Eligibility::Available => TopicStatus::Available,
            Eligibility::CoolingDown => TopicStatus::Used,
            Eligibility::SimilarToRecent { .. } => TopicStatus::Blocked,
            Eligibility::PendingApproval if topic.is_fresh() => TopicStatus::Available,
            Eligibility::PendingApproval => TopicStatus::Used,
        }
    }
}

/// Rotation order: never-used first, then least recently used, then oldest.
pub fn rotation_order(a: &Topic, b: &Topic) -> Ordering {
    b.is_fresh()
        .cmp(&a.is_fresh())
        .then_with(|| match (a.last_used_at, b.last_used_at) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => x.cmp(&y),
        })
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.topic_id.cmp(&b.topic_id))
}

/// Every topic of one category with its eligibility.
#[derive(Debug, Clone)]
pub struct CategorySnapshot {
    pub category: Category,
    pub params: SelectionParams,
    pub entries: Vec<(Topic, Eligibility)>,
}

impl CategorySnapshot {
    /// Load and classify a category at `now`.
    pub fn load(
        storage: &TopicStorage,
        category: Category,
        params: SelectionParams,
        now: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        let topics = storage.list_topics(category)?;
        let blocks = storage.list_blocks(category)?;
        Ok(Self::classify(category, topics, &blocks, params, now))
    }

    /// Classify `topics` against materialized `blocks` and direct embedding
    /// similarity to the recently used topics.
    pub fn classify(
        category: Category,
        topics: Vec<Topic>,
        blocks: &[SimilarityBlock],
        params: SelectionParams,
        now: DateTime<Utc>,
    ) -> Self {
        let recent: Vec<&Topic> = match params.cutoff(now) {
            Some(cutoff) => topics.iter().filter(|t| t.used_since(cutoff)).collect(),
            None => Vec::new(),
        };
        let recent_ids: HashSet<String> = recent.iter().map(|t| t.topic_id.clone()).collect();

        // Strongest link from each non-recent topic to any recent one
        let mut similar: HashMap<String, (String, f32)> = HashMap::new();
        let mut note = |candidate: &str, recent_id: &str, score: f32| {
            let entry = similar
                .entry(candidate.to_string())
                .or_insert_with(|| (recent_id.to_string(), score));
            if score > entry.1 {
                *entry = (recent_id.to_string(), score);
            }
        };

        for block in blocks {
            if block.score < params.similarity_threshold {
                continue;
            }
            let a_recent = recent_ids.contains(block.topic_a.as_str());
            let b_recent = recent_ids.contains(block.topic_b.as_str());
            if a_recent && !b_recent {
                note(&block.topic_b, &block.topic_a, block.score);
            } else if b_recent && !a_recent {
                note(&block.topic_a, &block.topic_b, block.score);
            }
        }

        for topic in topics.iter().filter(|t| !recent_ids.contains(t.topic_id.as_str())) {
            for used in &recent {
                if let Some(score) = topic_similarity(topic, used) {
                    if score >= params.similarity_threshold {
                        note(&topic.topic_id, &used.topic_id, score);
                    }
                }
            }
        }

        let entries = topics
            .into_iter()
            .map(|topic| {
                let eligibility = if !topic.approved {
                    Eligibility::PendingApproval
                } else if recent_ids.contains(topic.topic_id.as_str()) {
                    Eligibility::CoolingDown
                } else if let Some((recent_topic_id, score)) = similar.get(&topic.topic_id) {
                    Eligibility::SimilarToRecent {
                        recent_topic_id: recent_topic_id.clone(),
                        score: *score,
                    }
                } else {
                    Eligibility::Available
                };
                (topic, eligibility)
            })
            .collect::<Vec<_>>();

        debug!(
            category = %category,
            topics = entries.len(),
            recent = recent_ids.len(),
            "Classified category"
        );

        Self {
            category,
            params,
            entries,
        }
    }

    /// Selectable topics in rotation order.
    pub fn candidates(&self) -> Vec<&Topic> {
        let mut candidates: Vec<&Topic> = self
            .entries
            .iter()
            .filter(|(_, e)| *e == Eligibility::Available)
            .map(|(t, _)| t)
            .collect();
        candidates.sort_by(|a, b| rotation_order(a, b));
        candidates
    }

    pub fn count(&self, predicate: impl Fn(&Eligibility) -> bool) -> usize {
        self.entries.iter().filter(|(_, e)| predicate(e)).count()
    }

    pub fn available(&self) -> usize {
        self.count(|e| *e == Eligibility::Available)
    }

    pub fn cooling_down(&self) -> usize {
        self.count(|e| *e == Eligibility::CoolingDown)
    }

    pub fn similarity_blocked(&self) -> usize {
        self.count(|e| matches!(e, Eligibility::SimilarToRecent { .. }))
    }

    pub fn pending_approval(&self) -> usize {
        self.count(|e| *e == Eligibility::PendingApproval)
    }

    /// Topics whose stored status differs from the classification.
    pub fn stale_statuses(&self, now: DateTime<Utc>) -> Vec<Topic> {
        self.entries
            .iter()
            .filter_map(|(topic, eligibility)| {
                let status = eligibility.status_for(topic);
                if topic.status == status {
                    return None;
                }
                let mut updated = topic.clone();
                updated.status = status;
                updated.updated_at = now;
                Some(updated)
            })
            .collect()
    }
}

/// Recompute and persist the advisory status of every topic in a category.
///
/// Returns the number of topics whose status changed.
pub fn refresh_statuses(
    storage: &TopicStorage,
    category: Category,
    params: SelectionParams,
    now: DateTime<Utc>,
) -> Result<usize, EngineError> {
    let _guard = storage.storage().write_guard()?;
    let snapshot = CategorySnapshot::load(storage, category, params, now)?;
    let stale = snapshot.stale_statuses(now);
    storage.save_topics(&stale)?;
    if !stale.is_empty() {
        debug!(category = %category, changed = stale.len(), "Refreshed topic statuses");
    }
    Ok(stale.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use topic_types::TopicSource;

    fn params() -> SelectionParams {
        SelectionParams::new(0.85, 90).unwrap()
    }

    fn topic_at(text: &str, embedding: Vec<f32>, created_at: DateTime<Utc>) -> Topic {
        Topic::new_at(
            Category::AiAutomation,
            text,
            embedding,
            true,
            TopicSource::Manual,
            created_at,
        )
    }

    #[test]
    fn test_params_validation_names_parameter() {
        match SelectionParams::new(0.0, 10) {
            Err(EngineError::Validation { parameter, .. }) => {
                assert_eq!(parameter, "similarity_threshold")
            }
            other => panic!("unexpected: {:?}", other),
        }
        match SelectionParams::new(0.85, -1) {
            Err(EngineError::Validation { parameter, .. }) => {
                assert_eq!(parameter, "cooldown_days")
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(SelectionParams::new(1.0, 0).is_ok());
        assert!(SelectionParams::new(1.01, 0).is_err());
    }

    #[test]
    fn test_huge_cooldown_saturates() {
        let now = Utc::now();
        let p = SelectionParams::new(0.85, 200_000_000).unwrap();
        assert_eq!(p.cutoff(now), Some(DateTime::<Utc>::MIN_UTC));
        assert_eq!(days_before(now, u32::MAX), DateTime::<Utc>::MIN_UTC);
        assert_eq!(days_before(now, 1), now - Duration::days(1));

        let mut used = topic_at("used long ago", vec![1.0, 0.0], now - Duration::days(4000));
        used.mark_used(now - Duration::days(3000));
        let fresh = topic_at("fresh", vec![0.0, 1.0], now - Duration::days(1));
        let snapshot =
            CategorySnapshot::classify(Category::AiAutomation, vec![used, fresh], &[], p, now);
        assert_eq!(snapshot.cooling_down(), 1);
        assert_eq!(snapshot.available(), 1);
    }

    #[test]
    fn test_zero_cooldown_disables_gate() {
        let p = SelectionParams::new(0.85, 0).unwrap();
        assert!(p.cutoff(Utc::now()).is_none());
    }

    #[test]
    fn test_rotation_order() {
        let now = Utc::now();
        let mut used_long_ago = topic_at("a", vec![], now - Duration::days(10));
        used_long_ago.mark_used(now - Duration::days(200));
        let mut used_recently = topic_at("b", vec![], now - Duration::days(20));
        used_recently.mark_used(now - Duration::days(100));
        let fresh_newer = topic_at("c", vec![], now - Duration::days(1));
        let fresh_older = topic_at("d", vec![], now - Duration::days(5));

        let mut topics = vec![&used_recently, &fresh_newer, &used_long_ago, &fresh_older];
        topics.sort_by(|a, b| rotation_order(a, b));
        let texts: Vec<&str> = topics.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["d", "c", "a", "b"]);
    }

    #[test]
    fn test_classify_cooldown_and_block() {
        let now = Utc::now();
        let mut used = topic_at("used", vec![1.0, 0.0], now - Duration::days(3));
        used.mark_used(now - Duration::days(5));
        let near = topic_at("near", vec![0.99, 0.05], now - Duration::days(2));
        let far = topic_at("far", vec![0.0, 1.0], now - Duration::days(1));
        let mut pending = topic_at("pending", vec![0.0, 1.0], now);
        pending.approved = false;

        let snapshot = CategorySnapshot::classify(
            Category::AiAutomation,
            vec![used.clone(), near.clone(), far.clone(), pending],
            &[],
            params(),
            now,
        );

        assert_eq!(snapshot.cooling_down(), 1);
        assert_eq!(snapshot.similarity_blocked(), 1);
        assert_eq!(snapshot.pending_approval(), 1);
        assert_eq!(snapshot.available(), 1);
        let candidates = snapshot.candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].topic_id, far.topic_id);
    }

    #[test]
    fn test_classify_uses_materialized_blocks_without_embeddings() {
        let now = Utc::now();
        let mut used = topic_at("used", vec![], now - Duration::days(3));
        used.mark_used(now - Duration::days(1));
        let other = topic_at("other", vec![], now - Duration::days(2));
        let block = SimilarityBlock::new(
            &used.topic_id,
            &other.topic_id,
            Category::AiAutomation,
            0.9,
            0.85,
            now,
        );

        let snapshot = CategorySnapshot::classify(
            Category::AiAutomation,
            vec![used.clone(), other.clone()],
            &[block.clone()],
            params(),
            now,
        );
        assert!(snapshot.candidates().is_empty());
        assert_eq!(snapshot.similarity_blocked(), 1);

        // A stricter threshold ignores the weaker block
        let strict = SelectionParams::new(0.95, 90).unwrap();
        let snapshot = CategorySnapshot::classify(
            Category::AiAutomation,
            vec![used, other.clone()],
            &[block],
            strict,
            now,
        );
        let candidates = snapshot.candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].topic_id, other.topic_id);
    }

    #[test]
    fn test_usage_outside_window_does_not_block() {
        let now = Utc::now();
        let mut old = topic_at("old", vec![1.0, 0.0], now - Duration::days(400));
        old.mark_used(now - Duration::days(91));
        let twin = topic_at("twin", vec![1.0, 0.0], now - Duration::days(300));

        let snapshot = CategorySnapshot::classify(
            Category::AiAutomation,
            vec![old, twin.clone()],
            &[],
            params(),
            now,
        );
        let candidates = snapshot.candidates();
        assert_eq!(candidates.len(), 2);
        // Never-used twin rotates first
        assert_eq!(candidates[0].topic_id, twin.topic_id);
    }

    #[test]
    fn test_stale_statuses() {
        let now = Utc::now();
        let mut used = topic_at("used", vec![1.0, 0.0], now);
        used.mark_used(now);
        let near = topic_at("near", vec![1.0, 0.0], now);

        let snapshot = CategorySnapshot::classify(
            Category::AiAutomation,
            vec![used, near.clone()],
            &[],
            params(),
            now,
        );
        let stale = snapshot.stale_statuses(now);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].topic_id, near.topic_id);
        assert_eq!(stale[0].status, TopicStatus::Blocked);
    }
}
