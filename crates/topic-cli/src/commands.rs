//! Command implementations for the topic admin tool.
//!
//! Every command opens the store, runs one engine operation and prints the
//! result as pretty JSON on stdout. Logs go to stderr.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use topic_embeddings::{
    ApiEmbedder, ApiEmbedderConfig, Embedding, EmbeddingError, EmbeddingProvider, ModelInfo,
};
use topic_engine::{
    ApiTopicGenerator, ApiTopicGeneratorConfig, ExpansionRequest, GeneratorError,
    SelectionRequest, TopicEngine, TopicGenerator, TopicStorage,
};
use topic_storage::Storage;
use topic_types::{Category, Settings, UsageOutcome};
use tracing::{info, warn};

use crate::cli::{Cli, Commands};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db_path) = &cli.db_path {
        settings.db_path = db_path.clone();
    }
    if let Some(log_level) = &cli.log_level {
        settings.log_level = log_level.clone();
    }
    Ok(settings)
}

fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Stand-in for a service whose credentials are not configured.
///
/// Commands that never call the service still work.
struct Unconfigured {
    info: ModelInfo,
    reason: String,
}

impl Unconfigured {
    fn new(name: &str, reason: impl Into<String>) -> Self {
        Self {
            info: ModelInfo {
                name: name.to_string(),
                dimension: None,
            },
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for Unconfigured {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn embed(&self, _text: &str) -> Result<Embedding, EmbeddingError> {
        Err(EmbeddingError::Config(self.reason.clone()))
    }
}

#[async_trait]
impl TopicGenerator for Unconfigured {
    async fn propose(
        &self,
        _category: Category,
        _count: usize,
    ) -> Result<Vec<String>, GeneratorError> {
        Err(GeneratorError::Config(self.reason.clone()))
    }
}

fn build_embedder(settings: &Settings) -> Result<Arc<dyn EmbeddingProvider>> {
    match &settings.embedding.api_key {
        Some(key) => {
            let config = ApiEmbedderConfig::openai(key, &settings.embedding.model)
                .with_base_url(&settings.embedding.base_url);
            let embedder = ApiEmbedder::new(config).context("Failed to create embedder")?;
            Ok(Arc::new(embedder))
        }
        None => Ok(Arc::new(Unconfigured::new(
            "unconfigured",
            "embedding.api_key is not set",
        ))),
    }
}

fn build_generator(settings: &Settings) -> Result<Arc<dyn TopicGenerator>> {
    match ApiTopicGeneratorConfig::from_settings(&settings.generator) {
        Ok(config) => {
            let generator = ApiTopicGenerator::new(config).context("Failed to create generator")?;
            Ok(Arc::new(generator))
        }
        Err(e) => Ok(Arc::new(Unconfigured::new("unconfigured", e.to_string()))),
    }
}

/// Open storage and wire the engine.
pub fn build_engine(settings: &Settings) -> Result<TopicEngine> {
    let db_path = settings.expanded_db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let storage = Storage::open(&db_path)
        .with_context(|| format!("Failed to open storage at {}", db_path.display()))?;

    TopicEngine::new(
        Arc::new(TopicStorage::new(Arc::new(storage))),
        build_embedder(settings)?,
        build_generator(settings)?,
        settings.engine.clone(),
    )
    .context("Invalid engine configuration")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run one command against an engine.
pub async fn execute(engine: &TopicEngine, settings: &Settings, command: Commands) -> Result<()> {
    match command {
        Commands::Select {
            category,
            threshold,
            cooldown_days,
        } => {
            let request = SelectionRequest {
                category,
                similarity_threshold: threshold,
                cooldown_days,
            };
            print_json(&engine.select_topic(&request)?)
        }
        Commands::Record {
            topic_id,
            error,
            content_id,
            duration_ms,
        } => {
            let mut outcome = match error {
                Some(message) => UsageOutcome::failed(message),
                None => UsageOutcome::succeeded(),
            };
            outcome.content_id = content_id;
            outcome.duration_ms = duration_ms;
            engine.record_usage(&topic_id, &outcome)?;
            print_json(&json!({ "topic_id": topic_id, "success": outcome.success }))
        }
        Commands::Recalculate { threshold, clear } => {
            if clear {
                let removed = engine.clear_similarity_blocks(None)?;
                info!(removed, "Cleared similarity blocks before recalculation");
            }
            print_json(&engine.recalculate_similarities(threshold).await?)
        }
        Commands::Expand {
            category,
            count,
            automatic,
        } => {
            let request = if automatic {
                ExpansionRequest::automatic(
                    category,
                    count,
                    settings.engine.expansion.auto_generation_enabled,
                )
            } else {
                ExpansionRequest::manual(category, count)
            };
            print_json(&engine.expand_category(&request).await?)
        }
        Commands::Stats { category } => {
            print_json(&engine.get_category_stats(category.as_deref())?)
        }
        Commands::Add {
            category,
            text,
            pending,
        } => print_json(&engine.add_topic(&category, &text, !pending).await?),
        Commands::Approve { topic_id } => print_json(&engine.set_approval(&topic_id, true)?),
        Commands::Retire { topic_id } => print_json(&engine.set_approval(&topic_id, false)?),
        Commands::History { topic_id } => print_json(&engine.usage_history(&topic_id)?),
        Commands::List { category } => print_json(&engine.list_topics(&category)?),
    }
}

/// Entry point used by `main`.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    init_logging(&settings)?;
    if settings.embedding.api_key.is_none() {
        warn!("embedding.api_key is not set; commands that embed text will fail");
    }

    let engine = build_engine(&settings)?;
    execute(&engine, &settings, cli.command).await
}
