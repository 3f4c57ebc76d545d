//! CLI argument parsing for the topic admin tool.
//!
//! CLI flags override all other config sources.

use clap::{Parser, Subcommand};

/// Topic rotation admin
///
/// Select, record and curate blog topics from the local topic store.
#[derive(Parser, Debug)]
#[command(name = "topic-admin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/topic-engine/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override database path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Admin commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Select the next topic for a category
    Select {
        /// Category (ai-automation, web-development, digital-marketing, business-growth)
        category: String,

        /// Similarity threshold in (0, 1]
        #[arg(long)]
        threshold: Option<f32>,

        /// Cooldown window in days
        #[arg(long)]
        cooldown_days: Option<i64>,
    },

    /// Record the outcome of using a topic
    Record {
        /// Topic ID
        topic_id: String,

        /// Mark the attempt as failed with this message
        #[arg(long)]
        error: Option<String>,

        /// ID of the produced content
        #[arg(long)]
        content_id: Option<String>,

        /// Generation time in milliseconds
        #[arg(long)]
        duration_ms: Option<u64>,
    },

    /// Recompute similarity blocks across all categories
    Recalculate {
        /// Block threshold in (0, 1] (default from config)
        #[arg(long)]
        threshold: Option<f32>,

        /// Delete existing blocks first
        #[arg(long)]
        clear: bool,
    },

    /// Generate new topics for a category
    Expand {
        category: String,

        /// Number of topics to add
        #[arg(short = 'n', long, default_value = "5")]
        count: usize,

        /// Run as an automatic expansion (results need approval)
        #[arg(long)]
        automatic: bool,
    },

    /// Show category statistics
    Stats {
        /// Category (all categories if omitted)
        category: Option<String>,
    },

    /// Add a topic by hand
    Add {
        category: String,

        /// Topic text
        text: String,

        /// Store as a proposal awaiting approval
        #[arg(long)]
        pending: bool,
    },

    /// Approve a proposed topic
    Approve { topic_id: String },

    /// Retire a topic from selection
    Retire { topic_id: String },

    /// Show usage history of a topic
    History { topic_id: String },

    /// List topics in a category
    List { category: String },
}
