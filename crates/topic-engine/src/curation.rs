//! Operator curation: manual inserts, approval and retirement.

use chrono::{DateTime, Utc};
use topic_embeddings::EmbeddingProvider;
use topic_types::{Category, EngineConfig, Topic, TopicSource};
use tracing::{info, instrument, warn};

use crate::eligibility::{refresh_statuses, SelectionParams};
use crate::error::EngineError;
use crate::external::embed_with_retry;
use crate::index::SimilarityIndexBuilder;
use crate::normalize::{duplicate_key, normalize_topic_text};
use crate::storage::TopicStorage;

/// Adds topics by hand and flips approval.
pub struct TopicCurator<'a> {
    storage: &'a TopicStorage,
    embedder: &'a dyn EmbeddingProvider,
    config: &'a EngineConfig,
}

impl<'a> TopicCurator<'a> {
    pub fn new(
        storage: &'a TopicStorage,
        embedder: &'a dyn EmbeddingProvider,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            storage,
            embedder,
            config,
        }
    }

    /// Insert an operator-supplied topic.
    ///
    /// The text is embedded before insert; an embedding failure is returned.
    #[instrument(skip(self, text))]
    pub async fn add_topic(
        &self,
        category: &str,
        text: &str,
        approved: bool,
    ) -> Result<Topic, EngineError> {
        self.add_topic_at(category, text, approved, Utc::now()).await
    }

    pub async fn add_topic_at(
        &self,
        category: &str,
        text: &str,
        approved: bool,
        now: DateTime<Utc>,
    ) -> Result<Topic, EngineError> {
        let category: Category = category.parse()?;
        let max_chars = self.config.expansion.max_topic_length;
        if text.trim().chars().count() > max_chars {
            return Err(EngineError::validation(
                "text",
                format!("longer than {} characters", max_chars),
            ));
        }
        let text = normalize_topic_text(text, max_chars)
            .ok_or_else(|| EngineError::validation("text", "must not be empty"))?;

        let key = duplicate_key(&text);
        if self
            .storage
            .list_topics(category)?
            .iter()
            .any(|t| duplicate_key(&t.text) == key)
        {
            return Err(EngineError::Duplicate(text));
        }

        let embedding = embed_with_retry(self.embedder, &text, &self.config.external).await?;
        let topic = Topic::new_at(category, text, embedding, approved, TopicSource::Manual, now);
        self.storage.insert_topic(&topic)?;

        SimilarityIndexBuilder::new(self.storage, self.embedder, self.config).index_topic(
            &topic,
            self.config.similarity.block_threshold,
            now,
        )?;
        self.refresh(category, now);

        info!(topic_id = %topic.topic_id, category = %category, "Added topic");
        Ok(topic)
    }

    /// Approve a proposal or retire a topic.
    #[instrument(skip(self))]
    pub fn set_approval(&self, topic_id: &str, approved: bool) -> Result<Topic, EngineError> {
        let now = Utc::now();
        let topic = self.storage.update_topic(topic_id, |t| {
            t.approved = approved;
            t.updated_at = now;
        })?;
        self.refresh(topic.category, now);
        info!(approved, "Updated topic approval");
        Ok(topic)
    }

    fn refresh(&self, category: Category, now: DateTime<Utc>) {
        let result = SelectionParams::new(
            self.config.selection.similarity_threshold,
            i64::from(self.config.selection.cooldown_days),
        )
        .and_then(|params| refresh_statuses(self.storage, category, params, now));
        if let Err(e) = result {
            warn!(category = %category, error = %e, "Failed to refresh topic statuses");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;
    use topic_embeddings::StaticEmbedder;
    use topic_storage::Storage;

    fn create_test_storage() -> (TopicStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (TopicStorage::new(Arc::new(storage)), temp_dir)
    }

    #[tokio::test]
    async fn test_add_topic_embeds_and_stores() {
        let (storage, _temp) = create_test_storage();
        let embedder = StaticEmbedder::new(16);
        let config = EngineConfig::default();
        let curator = TopicCurator::new(&storage, &embedder, &config);

        let topic = curator
            .add_topic("ai-automation", "  Agents that file expense reports ", true)
            .await
            .unwrap();
        assert_eq!(topic.text, "Agents that file expense reports");
        assert_eq!(topic.source, TopicSource::Manual);
        assert!(topic.has_embedding());
        assert_eq!(storage.get_topic(&topic.topic_id).unwrap().unwrap().text, topic.text);
    }

    #[tokio::test]
    async fn test_add_topic_rejects_duplicates_and_bad_input() {
        let (storage, _temp) = create_test_storage();
        let embedder = StaticEmbedder::new(16);
        let config = EngineConfig::default();
        let curator = TopicCurator::new(&storage, &embedder, &config);

        curator.add_topic("web-development", "Astro vs Next", true).await.unwrap();
        assert!(matches!(
            curator.add_topic("web-development", "astro VS next", true).await,
            Err(EngineError::Duplicate(_))
        ));
        assert!(matches!(
            curator.add_topic("web-development", "   ", true).await,
            Err(EngineError::Validation { .. })
        ));
        assert!(matches!(
            curator.add_topic("knitting", "Yarn", true).await,
            Err(EngineError::Validation { .. })
        ));
        let long = "x".repeat(config.expansion.max_topic_length + 1);
        assert!(curator.add_topic("web-development", &long, true).await.is_err());
    }

    #[tokio::test]
    async fn test_add_topic_blocks_near_duplicates() {
        let (storage, _temp) = create_test_storage();
        let embedder = StaticEmbedder::new(2)
            .with_vector("Landing page teardown", vec![1.0, 0.0])
            .with_vector("Teardown of a landing page", vec![0.99, 0.05]);
        let config = EngineConfig::default();
        let curator = TopicCurator::new(&storage, &embedder, &config);

        curator.add_topic("digital-marketing", "Landing page teardown", true).await.unwrap();
        curator
            .add_topic("digital-marketing", "Teardown of a landing page", true)
            .await
            .unwrap();
        assert_eq!(storage.list_blocks(Category::DigitalMarketing).unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_topic_surfaces_embedding_failure() {
        let (storage, _temp) = create_test_storage();
        let embedder = StaticEmbedder::new(4).failing_on("Broken");
        let config = EngineConfig::default();
        let curator = TopicCurator::new(&storage, &embedder, &config);

        assert!(curator.add_topic("business-growth", "Broken", true).await.is_err());
        assert!(storage.list_topics(Category::BusinessGrowth).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_approval() {
        let (storage, _temp) = create_test_storage();
        let embedder = StaticEmbedder::new(8);
        let config = EngineConfig::default();
        let curator = TopicCurator::new(&storage, &embedder, &config);

        let topic = curator.add_topic("business-growth", "Referral loops", false).await.unwrap();
        assert!(!topic.approved);
        let approved = curator.set_approval(&topic.topic_id, true).unwrap();
        assert!(approved.approved);
        let retired = curator.set_approval(&topic.topic_id, false).unwrap();
        assert!(!retired.approved);
        assert!(matches!(
            curator.set_approval("missing", true),
            Err(EngineError::NotFound(_))
        ));
    }
}
