//! Topic admin tool
//!
//! Operator surface for the topic rotation engine.
//!
//! # Usage
//!
//! ```bash
//! topic-admin select ai-automation [--threshold 0.9] [--cooldown-days 60]
//! topic-admin record <TOPIC_ID> [--error MSG] [--content-id ID]
//! topic-admin recalculate [--threshold 0.85] [--clear]
//! topic-admin expand web-development -n 10
//! topic-admin stats [CATEGORY]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/topic-engine/config.toml)
//! 3. `--config` file
//! 4. Environment variables (TOPICS_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use topic_cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}
