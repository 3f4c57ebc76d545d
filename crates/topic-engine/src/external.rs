//! Time-bounded calls to the embedding and generation services.

use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};
use topic_embeddings::EmbeddingProvider;
use topic_types::{Category, ExternalCallConfig};
use tracing::{debug, error, warn};

use crate::error::{EngineError, ExternalService};
use crate::generator::TopicGenerator;

/// Embed `text` with a per-attempt timeout and bounded retries.
pub async fn embed_with_retry(
    embedder: &dyn EmbeddingProvider,
    text: &str,
    config: &ExternalCallConfig,
) -> Result<Vec<f32>, EngineError> {
    let mut backoff = ExponentialBackoff {
        current_interval: Duration::from_millis(250),
        initial_interval: Duration::from_millis(250),
        max_elapsed_time: Some(Duration::from_secs(30)),
        ..Default::default()
    };
    let attempt_timeout = Duration::from_secs(config.embed_timeout_secs);
    let mut attempts = 0;

    loop {
        attempts += 1;
        debug!(attempt = attempts, "Calling embedding service");

        let err = match tokio::time::timeout(attempt_timeout, embedder.embed(text)).await {
            Ok(Ok(embedding)) => return Ok(embedding.into_vec()),
            Ok(Err(e)) => EngineError::external(ExternalService::Embedding, e),
            Err(_) => EngineError::Timeout {
                service: ExternalService::Embedding,
                seconds: config.embed_timeout_secs,
            },
        };

        if attempts > config.embed_retries {
            error!(error = %err, attempts, "Embedding retries exhausted");
            return Err(err);
        }

        match backoff.next_backoff() {
            Some(duration) => {
                warn!(
                    error = %err,
                    retry_in_ms = duration.as_millis(),
                    "Embedding call failed, retrying"
                );
                tokio::time::sleep(duration).await;
            }
            None => {
                error!(error = %err, "Backoff exhausted");
                return Err(err);
            }
        }
    }
}

/// Ask the generator for proposals once, bounded by a timeout.
pub async fn generate_once(
    generator: &dyn TopicGenerator,
    category: Category,
    count: usize,
    config: &ExternalCallConfig,
) -> Result<Vec<String>, EngineError> {
    let limit = Duration::from_secs(config.generate_timeout_secs);
    match tokio::time::timeout(limit, generator.propose(category, count)).await {
        Ok(Ok(proposals)) => Ok(proposals),
        Ok(Err(e)) => {
            error!(error = %e, "Topic generation failed");
            Err(EngineError::external(ExternalService::Generator, e))
        }
        Err(_) => {
            error!(seconds = config.generate_timeout_secs, "Topic generation timed out");
            Err(EngineError::Timeout {
                service: ExternalService::Generator,
                seconds: config.generate_timeout_secs,
            })
        }
    }
}
