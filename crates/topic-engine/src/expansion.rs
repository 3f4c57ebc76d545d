//! Topic pool expansion.
//!
//! Asks the generator for new topics, drops anything already in the
//! category (exactly or semantically), and stores the rest.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use topic_embeddings::EmbeddingProvider;
use topic_types::{Category, EngineConfig, Topic, TopicSource};
use tracing::{debug, info, instrument, warn};

use crate::eligibility::{refresh_statuses, SelectionParams};
use crate::error::EngineError;
use crate::external::{embed_with_retry, generate_once};
use crate::generator::TopicGenerator;
use crate::index::SimilarityIndexBuilder;
use crate::normalize::{duplicate_key, normalize_topic_text};
use crate::similarity::best_match;
use crate::storage::TopicStorage;

/// What started the expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionTrigger {
    /// Triggered by the system when a category runs dry
    Automatic,
    /// Requested by an operator; results are approved immediately
    Manual,
}

/// Expansion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionRequest {
    pub category: String,
    pub count: usize,
    pub trigger: ExpansionTrigger,
    /// Whether automatic generation is switched on for this caller
    #[serde(default)]
    pub auto_generation_enabled: bool,
}

impl ExpansionRequest {
    pub fn manual(category: impl Into<String>, count: usize) -> Self {
        Self {
            category: category.into(),
            count,
            trigger: ExpansionTrigger::Manual,
            auto_generation_enabled: false,
        }
    }

    pub fn automatic(category: impl Into<String>, count: usize, enabled: bool) -> Self {
        Self {
            category: category.into(),
            count,
            trigger: ExpansionTrigger::Automatic,
            auto_generation_enabled: enabled,
        }
    }
}

/// Generates, filters and stores new topics.
pub struct TopicExpander<'a> {
    storage: &'a TopicStorage,
    embedder: &'a dyn EmbeddingProvider,
    generator: &'a dyn TopicGenerator,
    config: &'a EngineConfig,
}

impl<'a> TopicExpander<'a> {
    pub fn new(
        storage: &'a TopicStorage,
        embedder: &'a dyn EmbeddingProvider,
        generator: &'a dyn TopicGenerator,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            storage,
            embedder,
            generator,
            config,
        }
    }

    pub async fn expand(&self, request: &ExpansionRequest) -> Result<Vec<Topic>, EngineError> {
        self.expand_at(request, Utc::now()).await
    }

    /// Expand a category as of `now`. Returns the inserted topics.
    #[instrument(
        skip(self, request),
        fields(category = %request.category, count = request.count, trigger = ?request.trigger)
    )]
    pub async fn expand_at(
        &self,
        request: &ExpansionRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<Topic>, EngineError> {
        let category: Category = request.category.parse()?;
        let max_count = self.config.expansion.max_count;
        if request.count == 0 || request.count > max_count {
            return Err(EngineError::validation(
                "count",
                format!("must be between 1 and {}, got {}", max_count, request.count),
            ));
        }
        if request.trigger == ExpansionTrigger::Automatic && !request.auto_generation_enabled {
            return Err(EngineError::Disabled);
        }

        let proposals =
            generate_once(self.generator, category, request.count, &self.config.external).await?;
        let proposed = proposals.len();

        let existing = self.storage.list_topics(category)?;
        let mut seen: HashSet<String> = existing.iter().map(|t| duplicate_key(&t.text)).collect();
        let approved = request.trigger == ExpansionTrigger::Manual;
        let indexer = SimilarityIndexBuilder::new(self.storage, self.embedder, self.config);
        let mut accepted: Vec<Topic> = Vec::new();

        for raw in proposals {
            if accepted.len() >= request.count {
                break;
            }
            let Some(text) = normalize_topic_text(&raw, self.config.expansion.max_topic_length)
            else {
                debug!(raw = %raw, "Dropping empty proposal");
                continue;
            };
            if !seen.insert(duplicate_key(&text)) {
                debug!(text = %text, "Dropping exact duplicate");
                continue;
            }

            let embedding =
                match embed_with_retry(self.embedder, &text, &self.config.external).await {
                    Ok(embedding) => embedding,
                    Err(e) => {
                        warn!(
                            text = %text,
                            error = %e,
                            "Skipping proposal that could not be embedded"
                        );
                        continue;
                    }
                };

            let known = existing
                .iter()
                .chain(accepted.iter())
                .map(|t| t.embedding.as_slice());
            if let Some((_, score)) =
                best_match(&embedding, known, self.config.expansion.dedupe_threshold)
            {
                debug!(text = %text, score, "Dropping near duplicate");
                continue;
            }

            let topic = Topic::new_at(
                category,
                text,
                embedding,
                approved,
                TopicSource::Generated,
                now,
            );
            self.storage.insert_topic(&topic)?;
            indexer.index_topic(&topic, self.config.similarity.block_threshold, now)?;
            accepted.push(topic);
        }

        let refreshed = SelectionParams::new(
            self.config.selection.similarity_threshold,
            i64::from(self.config.selection.cooldown_days),
        )
        .and_then(|params| refresh_statuses(self.storage, category, params, now));
        if let Err(e) = refreshed {
            warn!(category = %category, error = %e, "Failed to refresh topic statuses");
        }

        info!(proposed, inserted = accepted.len(), approved, "Expanded category");
        Ok(accepted)
    }
}
