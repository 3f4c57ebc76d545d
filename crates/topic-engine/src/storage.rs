//! Topic storage operations.
//!
//! Manages topics, usage history, similarity blocks and leases in RocksDB
//! column families. Multi-key writes go through one atomic batch.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use topic_storage::column_families::{
    CF_LEASES, CF_SIMILARITY_BLOCKS, CF_TOPICS, CF_TOPIC_INDEX, CF_USAGE_HISTORY,
};
use topic_storage::{
    BatchOp, BlockKey, CategoryIndexKey, HistoryKey, LeaseKey, Storage, TimelineKey, TopicKey,
};
use topic_types::{Category, SimilarityBlock, Topic, UsageHistoryEntry};
use tracing::{debug, info, instrument};
use ulid::Ulid;

use crate::error::EngineError;
use crate::lease::CategoryLease;

/// Topic storage interface.
pub struct TopicStorage {
    storage: Arc<Storage>,
}

impl TopicStorage {
    /// Create a new topic storage wrapper.
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Get underlying storage.
    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    // --- Topics ---

    /// Insert a new topic together with its category index entry.
    #[instrument(skip(self, topic), fields(topic_id = %topic.topic_id, category = %topic.category))]
    pub fn insert_topic(&self, topic: &Topic) -> Result<(), EngineError> {
        let value = serde_json::to_vec(topic)?;
        self.storage.write_batch(vec![
            BatchOp::put(CF_TOPICS, TopicKey::new(&topic.topic_id).to_bytes(), value),
            BatchOp::put(
                CF_TOPIC_INDEX,
                CategoryIndexKey::new(topic.category, &topic.topic_id).to_bytes(),
                Vec::new(),
            ),
        ])?;
        debug!("Inserted topic");
        Ok(())
    }

    /// Overwrite an existing topic row.
    #[instrument(skip(self, topic), fields(topic_id = %topic.topic_id))]
    pub fn save_topic(&self, topic: &Topic) -> Result<(), EngineError> {
        let value = serde_json::to_vec(topic)?;
        self.storage
            .put(CF_TOPICS, &TopicKey::new(&topic.topic_id).to_bytes(), &value)?;
        debug!("Saved topic");
        Ok(())
    }

    /// Overwrite several topic rows atomically.
    pub fn save_topics(&self, topics: &[Topic]) -> Result<(), EngineError> {
        if topics.is_empty() {
            return Ok(());
        }
        let mut ops = Vec::with_capacity(topics.len());
        for topic in topics {
            ops.push(BatchOp::put(
                CF_TOPICS,
                TopicKey::new(&topic.topic_id).to_bytes(),
                serde_json::to_vec(topic)?,
            ));
        }
        self.storage.write_batch(ops)?;
        Ok(())
    }

    /// Get a topic by ID.
    #[instrument(skip(self))]
    pub fn get_topic(&self, topic_id: &str) -> Result<Option<Topic>, EngineError> {
        match self
            .storage
            .get(CF_TOPICS, &TopicKey::new(topic_id).to_bytes())?
        {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// List every topic of a category, oldest first.
    pub fn list_topics(&self, category: Category) -> Result<Vec<Topic>, EngineError> {
        let mut topics = Vec::new();
        for (key, _) in self
            .storage
            .prefix_iterator(CF_TOPIC_INDEX, &CategoryIndexKey::prefix(category))?
        {
            let index = CategoryIndexKey::from_bytes(&key)?;
            if let Some(topic) = self.get_topic(&index.topic_id)? {
                topics.push(topic);
            }
        }
        topics.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.topic_id.cmp(&b.topic_id))
        });
        Ok(topics)
    }

    /// Apply `update` to a topic under the write lock and persist it.
    #[instrument(skip(self, update))]
    pub fn update_topic<F>(&self, topic_id: &str, update: F) -> Result<Topic, EngineError>
    where
        F: FnOnce(&mut Topic),
    {
        let _guard = self.storage.write_guard()?;
        let mut topic = self
            .get_topic(topic_id)?
            .ok_or_else(|| EngineError::NotFound(topic_id.to_string()))?;
        update(&mut topic);
        self.save_topic(&topic)?;
        Ok(topic)
    }

    // --- Usage history ---

    fn history_ops(&self, entry: &UsageHistoryEntry) -> Result<Vec<BatchOp>, EngineError> {
        let value = entry.to_bytes()?;
        let ulid = entry
            .entry_id
            .parse::<Ulid>()
            .unwrap_or_else(|_| Ulid::new());
        let ts = entry.timestamp_ms();
        Ok(vec![
            BatchOp::put(
                CF_USAGE_HISTORY,
                HistoryKey::new(&entry.topic_id, ts, ulid).to_bytes(),
                value.clone(),
            ),
            BatchOp::put(
                CF_USAGE_HISTORY,
                TimelineKey::new(entry.category, ts, ulid).to_bytes(),
                value,
            ),
        ])
    }

    /// Append a history row (per-topic and per-category copies).
    #[instrument(skip(self, entry), fields(topic_id = %entry.topic_id, success = entry.success))]
    pub fn append_history(&self, entry: &UsageHistoryEntry) -> Result<(), EngineError> {
        self.storage.write_batch(self.history_ops(entry)?)?;
        debug!("Appended usage history");
        Ok(())
    }

    /// Mark a topic used and append its history row in one batch.
    ///
    /// Returns the updated topic.
    #[instrument(skip(self, entry), fields(topic_id = %entry.topic_id))]
    pub fn record_success(
        &self,
        entry: &UsageHistoryEntry,
        now: DateTime<Utc>,
    ) -> Result<Topic, EngineError> {
        let _guard = self.storage.write_guard()?;
        let mut topic = self
            .get_topic(&entry.topic_id)?
            .ok_or_else(|| EngineError::NotFound(entry.topic_id.clone()))?;
        topic.mark_used(now);

        let mut ops = vec![BatchOp::put(
            CF_TOPICS,
            TopicKey::new(&topic.topic_id).to_bytes(),
            serde_json::to_vec(&topic)?,
        )];
        ops.extend(self.history_ops(entry)?);
        self.storage.write_batch(ops)?;

        debug!(times_used = topic.times_used, "Recorded successful use");
        Ok(topic)
    }

    /// History of one topic, oldest first.
    pub fn topic_history(&self, topic_id: &str) -> Result<Vec<UsageHistoryEntry>, EngineError> {
        self.storage
            .prefix_iterator(CF_USAGE_HISTORY, &HistoryKey::prefix(topic_id))?
            .into_iter()
            .map(|(_, value)| Ok(UsageHistoryEntry::from_bytes(&value)?))
            .collect()
    }

    /// History of a category at or after `since`, oldest first.
    pub fn category_history_since(
        &self,
        category: Category,
        since: DateTime<Utc>,
    ) -> Result<Vec<UsageHistoryEntry>, EngineError> {
        let start = TimelineKey::prefix_start(category, since.timestamp_millis());
        self.storage
            .range_from(CF_USAGE_HISTORY, &start, &TimelineKey::prefix(category))?
            .into_iter()
            .map(|(_, value)| Ok(UsageHistoryEntry::from_bytes(&value)?))
            .collect()
    }

    /// Latest `limit` history rows of a category, newest first.
    pub fn recent_category_history(
        &self,
        category: Category,
        limit: usize,
    ) -> Result<Vec<UsageHistoryEntry>, EngineError> {
        self.storage
            .prefix_tail(CF_USAGE_HISTORY, &TimelineKey::prefix(category), limit)?
            .into_iter()
            .map(|(_, value)| Ok(UsageHistoryEntry::from_bytes(&value)?))
            .collect()
    }

    // --- Similarity blocks ---

    /// Upsert a block keyed by its normalized pair.
    ///
    /// Returns true if the pair was not blocked before.
    #[instrument(skip(self, block), fields(topic_a = %block.topic_a, topic_b = %block.topic_b))]
    pub fn upsert_block(&self, block: &SimilarityBlock) -> Result<bool, EngineError> {
        let key = BlockKey::new(block.category, &block.topic_a, &block.topic_b).to_bytes();
        let existed = self.storage.get(CF_SIMILARITY_BLOCKS, &key)?.is_some();
        self.storage
            .put(CF_SIMILARITY_BLOCKS, &key, &serde_json::to_vec(block)?)?;
        Ok(!existed)
    }

    /// All blocks of a category.
    pub fn list_blocks(&self, category: Category) -> Result<Vec<SimilarityBlock>, EngineError> {
        self.storage
            .prefix_iterator(CF_SIMILARITY_BLOCKS, &BlockKey::prefix(category))?
            .into_iter()
            .map(|(_, value)| Ok(serde_json::from_slice(&value)?))
            .collect()
    }

    /// Delete blocks of one category, or of every category.
    ///
    /// Returns the number of blocks removed.
    #[instrument(skip(self))]
    pub fn clear_blocks(&self, category: Option<Category>) -> Result<usize, EngineError> {
        let prefix = match category {
            Some(category) => BlockKey::prefix(category),
            None => BlockKey::prefix_all().to_vec(),
        };
        let ops: Vec<BatchOp> = self
            .storage
            .prefix_iterator(CF_SIMILARITY_BLOCKS, &prefix)?
            .into_iter()
            .map(|(key, _)| BatchOp::delete(CF_SIMILARITY_BLOCKS, key))
            .collect();
        let removed = ops.len();
        if removed > 0 {
            self.storage.write_batch(ops)?;
        }
        info!(removed, "Cleared similarity blocks");
        Ok(removed)
    }

    // --- Leases ---

    /// Take the category lease unless another holder has a live one.
    ///
    /// The same holder renews its own lease.
    #[instrument(skip(self))]
    pub fn acquire_lease(
        &self,
        category: Category,
        holder: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<CategoryLease>, EngineError> {
        let _guard = self.storage.write_guard()?;
        let key = LeaseKey::new(category).to_bytes();
        if let Some(bytes) = self.storage.get(CF_LEASES, &key)? {
            let current: CategoryLease = serde_json::from_slice(&bytes)?;
            if !current.is_expired(now) && current.holder != holder {
                debug!(holder = %current.holder, "Lease held elsewhere");
                return Ok(None);
            }
        }
        let lease = CategoryLease::new(category, holder, ttl, now);
        self.storage
            .put(CF_LEASES, &key, &serde_json::to_vec(&lease)?)?;
        debug!(lease_id = %lease.lease_id, "Lease acquired");
        Ok(Some(lease))
    }

    /// Release a lease if it is still the current one.
    ///
    /// Returns false when the lease had already been taken over.
    #[instrument(skip(self, lease), fields(category = %lease.category, lease_id = %lease.lease_id))]
    pub fn release_lease(&self, lease: &CategoryLease) -> Result<bool, EngineError> {
        let _guard = self.storage.write_guard()?;
        let key = LeaseKey::new(lease.category).to_bytes();
        match self.storage.get(CF_LEASES, &key)? {
            Some(bytes) => {
                let current: CategoryLease = serde_json::from_slice(&bytes)?;
                if current.lease_id != lease.lease_id {
                    return Ok(false);
                }
                self.storage.delete(CF_LEASES, &key)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
