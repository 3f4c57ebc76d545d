//! Usage recording.

use chrono::{DateTime, Utc};
use topic_types::{EngineConfig, UsageHistoryEntry, UsageOutcome};
use tracing::{debug, info, instrument, warn};

use crate::eligibility::{refresh_statuses, SelectionParams};
use crate::error::EngineError;
use crate::storage::TopicStorage;

/// Records the outcome of using a topic.
pub struct UsageRecorder<'a> {
    storage: &'a TopicStorage,
    config: &'a EngineConfig,
}

impl<'a> UsageRecorder<'a> {
    pub fn new(storage: &'a TopicStorage, config: &'a EngineConfig) -> Self {
        Self { storage, config }
    }

    /// Record an outcome now.
    pub fn record(&self, topic_id: &str, outcome: &UsageOutcome) -> Result<(), EngineError> {
        self.record_at(topic_id, outcome, Utc::now())
    }

    /// Record an outcome as of `now`.
    ///
    /// Success updates the topic and appends history atomically. Failure
    /// only appends history; a store error there is logged, not returned.
    #[instrument(skip(self, outcome), fields(success = outcome.success))]
    pub fn record_at(
        &self,
        topic_id: &str,
        outcome: &UsageOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let topic = self
            .storage
            .get_topic(topic_id)?
            .ok_or_else(|| EngineError::NotFound(topic_id.to_string()))?;
        let entry = UsageHistoryEntry::from_outcome(&topic.topic_id, topic.category, outcome, now);

        if !outcome.success {
            if let Err(e) = self.storage.append_history(&entry) {
                warn!(topic_id, error = %e, "Failed to append usage history for failed attempt");
            } else {
                debug!(topic_id, "Recorded failed attempt");
            }
            return Ok(());
        }

        let updated = self.storage.record_success(&entry, now)?;
        info!(
            topic_id,
            times_used = updated.times_used,
            content_id = ?outcome.content_id,
            "Recorded topic usage"
        );

        // Neighbours of a freshly used topic become blocked
        let params = SelectionParams::new(
            self.config.selection.similarity_threshold,
            i64::from(self.config.selection.cooldown_days),
        )?;
        if let Err(e) = refresh_statuses(self.storage, updated.category, params, now) {
            warn!(category = %updated.category, error = %e, "Failed to refresh topic statuses");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;
    use tempfile::TempDir;
    use topic_storage::Storage;
    use topic_types::{Category, Topic, TopicSource, TopicStatus};

    fn create_test_storage() -> (TopicStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (TopicStorage::new(Arc::new(storage)), temp_dir)
    }

    fn insert(storage: &TopicStorage, text: &str, embedding: Vec<f32>) -> Topic {
        let t = Topic::new(Category::DigitalMarketing, text, embedding, true, TopicSource::Manual);
        storage.insert_topic(&t).unwrap();
        t
    }

    #[test]
    fn test_unknown_topic_is_not_found() {
        let (storage, _temp) = create_test_storage();
        let config = EngineConfig::default();
        let result =
            UsageRecorder::new(&storage, &config).record("missing", &UsageOutcome::succeeded());
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_success_updates_topic_and_appends_history() {
        let (storage, _temp) = create_test_storage();
        let config = EngineConfig::default();
        let t = insert(&storage, "SEO for docs sites", vec![1.0, 0.0]);
        let now = Utc::now();

        UsageRecorder::new(&storage, &config)
            .record_at(&t.topic_id, &UsageOutcome::succeeded().with_duration_ms(1200), now)
            .unwrap();

        let loaded = storage.get_topic(&t.topic_id).unwrap().unwrap();
        assert_eq!(loaded.times_used, 1);
        assert_eq!(loaded.last_used_at, Some(now));
        assert_eq!(loaded.status, TopicStatus::Used);

        let history = storage.topic_history(&t.topic_id).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].success);
        assert_eq!(history[0].duration_ms, Some(1200));
    }

    #[test]
    fn test_failure_leaves_topic_untouched() {
        let (storage, _temp) = create_test_storage();
        let config = EngineConfig::default();
        let t = insert(&storage, "SEO for docs sites", vec![1.0, 0.0]);

        UsageRecorder::new(&storage, &config)
            .record(&t.topic_id, &UsageOutcome::failed("render failed"))
            .unwrap();

        let loaded = storage.get_topic(&t.topic_id).unwrap().unwrap();
        assert_eq!(loaded, t);
        let history = storage.topic_history(&t.topic_id).unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].success);
        assert_eq!(history[0].error_message.as_deref(), Some("render failed"));
    }

    #[test]
    fn test_last_used_never_moves_backwards() {
        let (storage, _temp) = create_test_storage();
        let config = EngineConfig::default();
        let t = insert(&storage, "Attribution models", vec![1.0, 0.0]);
        let recorder = UsageRecorder::new(&storage, &config);
        let now = Utc::now();

        recorder.record_at(&t.topic_id, &UsageOutcome::succeeded(), now).unwrap();
        recorder
            .record_at(&t.topic_id, &UsageOutcome::succeeded(), now - Duration::hours(1))
            .unwrap();

        let loaded = storage.get_topic(&t.topic_id).unwrap().unwrap();
        assert_eq!(loaded.times_used, 2);
        assert_eq!(loaded.last_used_at, Some(now));
    }

    #[test]
    fn test_success_marks_similar_topics_blocked() {
        let (storage, _temp) = create_test_storage();
        let config = EngineConfig::default();
        let used = insert(&storage, "Attribution models", vec![1.0, 0.0]);
        let twin = insert(&storage, "Attribution modelling", vec![0.99, 0.05]);

        UsageRecorder::new(&storage, &config)
            .record(&used.topic_id, &UsageOutcome::succeeded())
            .unwrap();

        let twin = storage.get_topic(&twin.topic_id).unwrap().unwrap();
        assert_eq!(twin.status, TopicStatus::Blocked);
    }
}
