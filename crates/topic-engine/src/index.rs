//! Similarity index maintenance.
//!
//! Materializes near-duplicate pairs as similarity blocks. Blocks are
//! upserted by normalized pair and never removed by a recalculation, so a
//! run at a higher threshold keeps the blocks of an earlier, lower one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use topic_embeddings::EmbeddingProvider;
use topic_types::{Category, EngineConfig, SimilarityBlock, Topic};
use tracing::{debug, info, instrument, warn};

use crate::eligibility::{refresh_statuses, SelectionParams};
use crate::error::EngineError;
use crate::external::embed_with_retry;
use crate::similarity::{similar_pairs, topic_similarity};
use crate::storage::TopicStorage;

/// Summary of a full recalculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalculationReport {
    /// Pairs at or above the threshold, all upserted
    pub blocks_upserted: usize,
    /// Of those, pairs that were not blocked before
    pub blocks_created: usize,
    pub topics_compared: usize,
    pub embeddings_backfilled: usize,
    pub embedding_failures: usize,
    pub statuses_refreshed: usize,
}

/// Validate a block threshold.
pub fn validate_threshold(threshold: f32) -> Result<f32, EngineError> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(threshold)
    } else {
        Err(EngineError::validation(
            "threshold",
            format!("must be in (0, 1], got {}", threshold),
        ))
    }
}

/// Builds and maintains similarity blocks.
pub struct SimilarityIndexBuilder<'a> {
    storage: &'a TopicStorage,
    embedder: &'a dyn EmbeddingProvider,
    config: &'a EngineConfig,
}

impl<'a> SimilarityIndexBuilder<'a> {
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

    /// Recompute blocks for every category.
    pub async fn recalculate(&self, threshold: f32) -> Result<RecalculationReport, EngineError> {
        self.recalculate_at(threshold, Utc::now()).await
    }

    /// Recompute blocks for every category as of `now`.
    #[instrument(skip(self))]
    pub async fn recalculate_at(
        &self,
        threshold: f32,
        now: DateTime<Utc>,
    ) -> Result<RecalculationReport, EngineError> {
        let threshold = validate_threshold(threshold)?;
        let params = self.default_params()?;
        let mut report = RecalculationReport::default();

        for &category in Category::all() {
            let mut topics = self.storage.list_topics(category)?;
            self.backfill_embeddings(&mut topics, &mut report).await?;

            for (i, j, score) in similar_pairs(&topics, threshold) {
                let block = SimilarityBlock::new(
                    &topics[i].topic_id,
                    &topics[j].topic_id,
                    category,
                    score,
                    threshold,
                    now,
                );
                if self.storage.upsert_block(&block)? {
                    report.blocks_created += 1;
                }
                report.blocks_upserted += 1;
            }
            report.topics_compared += topics.len();
            report.statuses_refreshed += refresh_statuses(self.storage, category, params, now)?;

            debug!(category = %category, topics = topics.len(), "Recalculated category");
        }

        info!(
            blocks_upserted = report.blocks_upserted,
            blocks_created = report.blocks_created,
            topics = report.topics_compared,
            backfilled = report.embeddings_backfilled,
            failures = report.embedding_failures,
            "Similarity recalculation complete"
        );
        Ok(report)
    }

    async fn backfill_embeddings(
        &self,
        topics: &mut [Topic],
        report: &mut RecalculationReport,
    ) -> Result<(), EngineError> {
        for topic in topics.iter_mut().filter(|t| !t.has_embedding()) {
            match embed_with_retry(self.embedder, &topic.text, &self.config.external).await {
                Ok(embedding) => {
                    let stored = self.storage.update_topic(&topic.topic_id, |t| {
                        t.embedding = embedding.clone();
                    })?;
                    *topic = stored;
                    report.embeddings_backfilled += 1;
                }
                Err(e) => {
                    warn!(
                        topic_id = %topic.topic_id,
                        error = %e,
                        "Skipping topic without embedding"
                    );
                    report.embedding_failures += 1;
                }
            }
        }
        Ok(())
    }

    /// Compare one topic to the rest of its category and upsert blocks.
    ///
    /// Returns the number of blocks upserted.
    #[instrument(skip(self, topic), fields(topic_id = %topic.topic_id))]
    pub fn index_topic(
        &self,
        topic: &Topic,
        threshold: f32,
        now: DateTime<Utc>,
    ) -> Result<usize, EngineError> {
        let threshold = validate_threshold(threshold)?;
        if !topic.has_embedding() {
            return Ok(0);
        }

        let mut upserted = 0;
        for other in self.storage.list_topics(topic.category)? {
            if other.topic_id == topic.topic_id {
                continue;
            }
            if let Some(score) = topic_similarity(topic, &other) {
                if score >= threshold {
                    let block = SimilarityBlock::new(
                        &topic.topic_id,
                        &other.topic_id,
                        topic.category,
                        score,
                        threshold,
                        now,
                    );
                    self.storage.upsert_block(&block)?;
                    upserted += 1;
                }
            }
        }
        debug!(upserted, "Indexed topic");
        Ok(upserted)
    }

    /// Remove blocks so the next recalculation starts clean.
    pub fn clear(&self, category: Option<Category>) -> Result<usize, EngineError> {
        self.storage.clear_blocks(category)
    }

    fn default_params(&self) -> Result<SelectionParams, EngineError> {
        SelectionParams::new(
            self.config.selection.similarity_threshold,
            i64::from(self.config.selection.cooldown_days),
        )
    }
}
