//! Configuration loading for the topic engine.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/topic-engine/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::TypesError;

/// Topic selection defaults, used when a caller omits a parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Block score at or above which topics count as duplicates
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Days a topic stays ineligible after a successful use
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: u32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            cooldown_days: default_cooldown_days(),
        }
    }
}

fn default_similarity_threshold() -> f32 {
    0.85
}
fn default_cooldown_days() -> u32 {
    90
}

/// Similarity index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Threshold used when indexing newly inserted topics
    #[serde(default = "default_similarity_threshold")]
    pub block_threshold: f32,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            block_threshold: default_similarity_threshold(),
        }
    }
}

/// Topic expansion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionConfig {
    /// Candidates at or above this similarity to an existing topic are dropped
    #[serde(default = "default_similarity_threshold")]
    pub dedupe_threshold: f32,

    /// Largest `count` accepted per expansion
    #[serde(default = "default_max_count")]
    pub max_count: usize,

    /// Maximum topic text length in characters
    #[serde(default = "default_max_topic_length")]
    pub max_topic_length: usize,

    /// Whether unattended (scheduled) expansion may run
    #[serde(default)]
    pub auto_generation_enabled: bool,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            dedupe_threshold: default_similarity_threshold(),
            max_count: default_max_count(),
            max_topic_length: default_max_topic_length(),
            auto_generation_enabled: false,
        }
    }
}

fn default_max_count() -> usize {
    25
}
fn default_max_topic_length() -> usize {
    300
}

/// Statistics aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Trailing window for the success rate
    #[serde(default = "default_success_window_days")]
    pub success_window_days: u32,

    #[serde(default = "default_most_used_limit")]
    pub most_used_limit: usize,

    #[serde(default = "default_timeline_limit")]
    pub timeline_limit: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            success_window_days: default_success_window_days(),
            most_used_limit: default_most_used_limit(),
            timeline_limit: default_timeline_limit(),
        }
    }
}

fn default_success_window_days() -> u32 {
    30
}
fn default_most_used_limit() -> usize {
    5
}
fn default_timeline_limit() -> usize {
    20
}

/// Timeouts and retry budget for calls to external services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalCallConfig {
    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,

    /// Extra attempts after the first embedding failure
    #[serde(default = "default_embed_retries")]
    pub embed_retries: u32,

    /// Generation is never retried; this only bounds a single call
    #[serde(default = "default_generate_timeout_secs")]
    pub generate_timeout_secs: u64,
}

impl Default for ExternalCallConfig {
    fn default() -> Self {
        Self {
            embed_timeout_secs: default_embed_timeout_secs(),
            embed_retries: default_embed_retries(),
            generate_timeout_secs: default_generate_timeout_secs(),
        }
    }
}

fn default_embed_timeout_secs() -> u64 {
    20
}
fn default_embed_retries() -> u32 {
    1
}
fn default_generate_timeout_secs() -> u64 {
    60
}

/// Engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub similarity: SimilarityConfig,

    #[serde(default)]
    pub expansion: ExpansionConfig,

    #[serde(default)]
    pub stats: StatsConfig,

    #[serde(default)]
    pub external: ExternalCallConfig,
}

impl EngineConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), TypesError> {
        check_threshold(
            "selection.similarity_threshold",
            self.selection.similarity_threshold,
        )?;
        check_threshold("similarity.block_threshold", self.similarity.block_threshold)?;
        check_threshold("expansion.dedupe_threshold", self.expansion.dedupe_threshold)?;
        if self.expansion.max_count == 0 {
            return Err(TypesError::invalid("expansion.max_count", "must be > 0"));
        }
        if self.expansion.max_topic_length == 0 {
            return Err(TypesError::invalid("expansion.max_topic_length", "must be > 0"));
        }
        if self.external.embed_timeout_secs == 0 {
            return Err(TypesError::invalid("external.embed_timeout_secs", "must be > 0"));
        }
        if self.external.generate_timeout_secs == 0 {
            return Err(TypesError::invalid(
                "external.generate_timeout_secs",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

fn check_threshold(parameter: &str, value: f32) -> Result<(), TypesError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(TypesError::invalid(
            parameter,
            format!("must be in (0, 1], got {}", value),
        ))
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// API base URL
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API key (loaded from env var, not stored in config file)
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_embedding_model(),
            api_key: None,
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Topic generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSettings {
    /// Provider name ("openai" or "anthropic")
    #[serde(default = "default_generator_provider")]
    pub provider: String,

    /// Model name (e.g., "gpt-4o-mini", "claude-3-haiku")
    #[serde(default = "default_generator_model")]
    pub model: String,

    /// API key (loaded from env var, not stored in config file)
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            provider: default_generator_provider(),
            model: default_generator_model(),
            api_key: None,
            api_base_url: None,
        }
    }
}

fn default_generator_provider() -> String {
    "openai".to_string()
}
fn default_generator_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to RocksDB storage directory
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default)]
    pub generator: GeneratorSettings,
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", "topic-engine")
        .map(|p| p.data_local_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
            engine: EngineConfig::default(),
            embedding: EmbeddingSettings::default(),
            generator: GeneratorSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/topic-engine/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (TOPICS_*, nested keys joined by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TypesError> {
        let config_dir = ProjectDirs::from("", "", "topic-engine")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // e.g. TOPICS_DB_PATH, TOPICS_ENGINE__SELECTION__COOLDOWN_DAYS
        builder = builder.add_source(
            Environment::with_prefix("TOPICS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TypesError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| TypesError::Config(e.to_string()))?;
        settings.engine.validate()?;
        Ok(settings)
    }

    /// Expand ~ in db_path to the home directory
    pub fn expanded_db_path(&self) -> PathBuf {
        if let Some(rest) = self.db_path.strip_prefix("~/") {
            if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
                return home.join(rest);
            }
        }
        PathBuf::from(&self.db_path)
    }
}
