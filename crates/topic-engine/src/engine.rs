//! Engine facade.
//!
//! Owns the store handle, the external service clients and configuration,
//! and hands borrowed views of them to the per-operation components.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use topic_embeddings::EmbeddingProvider;
use topic_types::{Category, CategoryStats, EngineConfig, Topic, UsageHistoryEntry, UsageOutcome};

use crate::curation::TopicCurator;
use crate::eligibility::SelectionParams;
use crate::error::EngineError;
use crate::expansion::{ExpansionRequest, TopicExpander};
use crate::generator::TopicGenerator;
use crate::index::{RecalculationReport, SimilarityIndexBuilder};
use crate::lease::CategoryLease;
use crate::recorder::UsageRecorder;
use crate::selector::{Selection, SelectionRequest, TopicSelector};
use crate::stats::StatsAggregator;
use crate::storage::TopicStorage;

/// Topic rotation engine.
pub struct TopicEngine {
    storage: Arc<TopicStorage>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn TopicGenerator>,
    config: EngineConfig,
}

impl TopicEngine {
    /// Create an engine. Fails if the configuration is invalid.
    pub fn new(
        storage: Arc<TopicStorage>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn TopicGenerator>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            storage,
            embedder,
            generator,
            config,
        })
    }

    pub fn storage(&self) -> &Arc<TopicStorage> {
        &self.storage
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Selection ---

    /// Pick the next topic for a category.
    pub fn select_topic(&self, request: &SelectionRequest) -> Result<Selection, EngineError> {
        self.select_topic_at(request, Utc::now())
    }

    pub fn select_topic_at(
        &self,
        request: &SelectionRequest,
        now: DateTime<Utc>,
    ) -> Result<Selection, EngineError> {
        TopicSelector::new(&self.storage, &self.config).select_at(request, now)
    }

    // --- Usage ---

    /// Record the outcome of using a topic.
    pub fn record_usage(&self, topic_id: &str, outcome: &UsageOutcome) -> Result<(), EngineError> {
        self.record_usage_at(topic_id, outcome, Utc::now())
    }

    pub fn record_usage_at(
        &self,
        topic_id: &str,
        outcome: &UsageOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        UsageRecorder::new(&self.storage, &self.config).record_at(topic_id, outcome, now)
    }

    /// Usage history of one topic, oldest first.
    pub fn usage_history(&self, topic_id: &str) -> Result<Vec<UsageHistoryEntry>, EngineError> {
        if self.storage.get_topic(topic_id)?.is_none() {
            return Err(EngineError::NotFound(topic_id.to_string()));
        }
        self.storage.topic_history(topic_id)
    }

    // --- Similarity ---

    /// Recompute similarity blocks. Uses the configured threshold if `None`.
    pub async fn recalculate_similarities(
        &self,
        threshold: Option<f32>,
    ) -> Result<RecalculationReport, EngineError> {
        let threshold = threshold.unwrap_or(self.config.similarity.block_threshold);
        self.index_builder().recalculate(threshold).await
    }

    /// Compare one stored topic against its category and upsert blocks.
    pub fn index_topic(
        &self,
        topic_id: &str,
        threshold: Option<f32>,
    ) -> Result<usize, EngineError> {
        let topic = self
            .storage
            .get_topic(topic_id)?
            .ok_or_else(|| EngineError::NotFound(topic_id.to_string()))?;
        let threshold = threshold.unwrap_or(self.config.similarity.block_threshold);
        self.index_builder().index_topic(&topic, threshold, Utc::now())
    }

    /// Delete similarity blocks of one category or of all of them.
    pub fn clear_similarity_blocks(&self, category: Option<&str>) -> Result<usize, EngineError> {
        let category = category.map(str::parse::<Category>).transpose()?;
        self.index_builder().clear(category)
    }

    fn index_builder(&self) -> SimilarityIndexBuilder<'_> {
        SimilarityIndexBuilder::new(&self.storage, self.embedder.as_ref(), &self.config)
    }

    // --- Expansion & curation ---

    /// Generate new topics for a category.
    pub async fn expand_category(
        &self,
        request: &ExpansionRequest,
    ) -> Result<Vec<Topic>, EngineError> {
        TopicExpander::new(
            &self.storage,
            self.embedder.as_ref(),
            self.generator.as_ref(),
            &self.config,
        )
        .expand(request)
        .await
    }

    /// Add a topic by hand.
    pub async fn add_topic(
        &self,
        category: &str,
        text: &str,
        approved: bool,
    ) -> Result<Topic, EngineError> {
        self.curator().add_topic(category, text, approved).await
    }

    /// Approve or retire a topic.
    pub fn set_approval(&self, topic_id: &str, approved: bool) -> Result<Topic, EngineError> {
        self.curator().set_approval(topic_id, approved)
    }

    fn curator(&self) -> TopicCurator<'_> {
        TopicCurator::new(&self.storage, self.embedder.as_ref(), &self.config)
    }

    pub fn get_topic(&self, topic_id: &str) -> Result<Option<Topic>, EngineError> {
        self.storage.get_topic(topic_id)
    }

    pub fn list_topics(&self, category: &str) -> Result<Vec<Topic>, EngineError> {
        self.storage.list_topics(category.parse()?)
    }

    // --- Stats ---

    /// Statistics for one category, or for all of them when `None`.
    pub fn get_category_stats(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<CategoryStats>, EngineError> {
        self.get_category_stats_at(category, Utc::now())
    }

    pub fn get_category_stats_at(
        &self,
        category: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<CategoryStats>, EngineError> {
        let categories = match category {
            Some(name) => vec![name.parse::<Category>()?],
            None => Category::all().to_vec(),
        };
        let params = SelectionParams::new(
            self.config.selection.similarity_threshold,
            i64::from(self.config.selection.cooldown_days),
        )?;
        let aggregator = StatsAggregator::new(&self.storage, &self.config.stats);
        categories
            .into_iter()
            .map(|c| aggregator.category_stats(c, params, now))
            .collect()
    }

    // --- Leases ---

    /// Take the selection lease for a category for `ttl`.
    pub fn acquire_lease(
        &self,
        category: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<Option<CategoryLease>, EngineError> {
        if ttl <= Duration::zero() {
            return Err(EngineError::validation("ttl", "must be positive"));
        }
        self.storage
            .acquire_lease(category.parse()?, holder, ttl, Utc::now())
    }

    pub fn release_lease(&self, lease: &CategoryLease) -> Result<bool, EngineError> {
        self.storage.release_lease(lease)
    }
}
