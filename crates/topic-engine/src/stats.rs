//! Per-category statistics.

use chrono::{DateTime, Utc};
use topic_types::{Category, CategoryStats, StatsConfig, TopicUsageSummary};
use tracing::instrument;

use crate::eligibility::{days_before, CategorySnapshot, SelectionParams};
use crate::error::EngineError;
use crate::storage::TopicStorage;

/// Builds [`CategoryStats`] from topics and usage history.
pub struct StatsAggregator<'a> {
    storage: &'a TopicStorage,
    config: &'a StatsConfig,
}

impl<'a> StatsAggregator<'a> {
    pub fn new(storage: &'a TopicStorage, config: &'a StatsConfig) -> Self {
        Self { storage, config }
    }

    /// Statistics for one category under `params`.
    #[instrument(skip(self, category, params), fields(category = %category))]
    pub fn category_stats(
        &self,
        category: Category,
        params: SelectionParams,
        now: DateTime<Utc>,
    ) -> Result<CategoryStats, EngineError> {
        let snapshot = CategorySnapshot::load(self.storage, category, params, now)?;
        self.from_snapshot(&snapshot, now)
    }

    /// Statistics for an already classified category.
    pub fn from_snapshot(
        &self,
        snapshot: &CategorySnapshot,
        now: DateTime<Utc>,
    ) -> Result<CategoryStats, EngineError> {
        let mut stats = CategoryStats::empty(snapshot.category, self.config.success_window_days);
        stats.total = snapshot.entries.len();
        stats.available = snapshot.available();
        stats.used = snapshot.cooling_down();
        stats.blocked = snapshot.similarity_blocked();
        stats.pending_approval = snapshot.pending_approval();

        let mut used: Vec<_> = snapshot
            .entries
            .iter()
            .map(|(t, _)| t)
            .filter(|t| t.times_used > 0)
            .collect();
        used.sort_by(|a, b| {
            b.times_used
                .cmp(&a.times_used)
                .then_with(|| b.last_used_at.cmp(&a.last_used_at))
        });
        stats.most_used = used
            .into_iter()
            .take(self.config.most_used_limit)
            .map(TopicUsageSummary::from)
            .collect();

        let since = days_before(now, self.config.success_window_days);
        let window = self
            .storage
            .category_history_since(snapshot.category, since)?;
        stats.attempts_in_window = window.len();
        if !window.is_empty() {
            let successes = window.iter().filter(|e| e.success).count();
            stats.success_rate = Some(successes as f64 / window.len() as f64);
        }

        stats.recent_usage = self
            .storage
            .recent_category_history(snapshot.category, self.config.timeline_limit)?;

        Ok(stats)
    }
}
