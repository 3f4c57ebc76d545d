//! Key encoding and decoding for the storage layer.
//!
//! Keys are `:`-separated ASCII strings. History keys embed a zero-padded
//! 13-digit millisecond timestamp followed by a ULID, so a prefix scan yields
//! rows in creation order:
//!
//! - `topic:{topic_id}`
//! - `cat:{category_code}:{topic_id}`
//! - `hist:{topic_id}:{timestamp_ms:013}:{ulid}`
//! - `time:{category_code}:{timestamp_ms:013}:{ulid}`
//! - `block:{category_code}:{topic_a}:{topic_b}` with `topic_a < topic_b`
//! - `lease:{category_code}`

use topic_types::Category;
use ulid::Ulid;

use crate::error::StorageError;

fn key_str(bytes: &[u8]) -> Result<&str, StorageError> {
    std::str::from_utf8(bytes).map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))
}

fn parse_ts(part: &str) -> Result<i64, StorageError> {
    part.parse()
        .map_err(|e| StorageError::Key(format!("Invalid timestamp: {}", e)))
}

fn parse_ulid(part: &str) -> Result<Ulid, StorageError> {
    part.parse()
        .map_err(|e| StorageError::Key(format!("Invalid ULID: {}", e)))
}

/// Key for topic records.
/// Format: topic:{topic_id}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicKey {
    pub topic_id: String,
}

impl TopicKey {
    pub fn new(topic_id: impl Into<String>) -> Self {
        Self {
            topic_id: topic_id.into(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("topic:{}", self.topic_id).into_bytes()
    }
}

/// Secondary index entry mapping a category to one of its topics.
/// Format: cat:{category_code}:{topic_id}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryIndexKey {
    pub category: Category,
    pub topic_id: String,
}

impl CategoryIndexKey {
    pub fn new(category: Category, topic_id: impl Into<String>) -> Self {
        Self {
            category,
            topic_id: topic_id.into(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("cat:{}:{}", self.category.code(), self.topic_id).into_bytes()
    }

    pub fn prefix(category: Category) -> Vec<u8> {
        format!("cat:{}:", category.code()).into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = key_str(bytes)?;
        let parts: Vec<&str> = s.splitn(3, ':').collect();
        if parts.len() != 3 || parts[0] != "cat" {
            return Err(StorageError::Key(format!("Invalid category index key: {}", s)));
        }
        let category = Category::from_code(parts[1])
            .ok_or_else(|| StorageError::Key(format!("Unknown category code: {}", parts[1])))?;
        Ok(Self::new(category, parts[2]))
    }
}

/// Per-topic history key.
/// Format: hist:{topic_id}:{timestamp_ms:013}:{ulid}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryKey {
    pub topic_id: String,
    pub timestamp_ms: i64,
    pub ulid: Ulid,
}

impl HistoryKey {
    pub fn new(topic_id: impl Into<String>, timestamp_ms: i64, ulid: Ulid) -> Self {
        Self {
            topic_id: topic_id.into(),
            timestamp_ms: timestamp_ms.max(0),
            ulid,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("hist:{}:{:013}:{}", self.topic_id, self.timestamp_ms, self.ulid).into_bytes()
    }

    pub fn prefix(topic_id: &str) -> Vec<u8> {
        format!("hist:{}:", topic_id).into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = key_str(bytes)?;
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 4 || parts[0] != "hist" {
            return Err(StorageError::Key(format!("Invalid history key: {}", s)));
        }
        Ok(Self {
            topic_id: parts[1].to_string(),
            timestamp_ms: parse_ts(parts[2])?,
            ulid: parse_ulid(parts[3])?,
        })
    }
}

/// Per-category timeline key pointing at the same history row.
/// Format: time:{category_code}:{timestamp_ms:013}:{ulid}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineKey {
    pub category: Category,
    pub timestamp_ms: i64,
    pub ulid: Ulid,
}

impl TimelineKey {
    pub fn new(category: Category, timestamp_ms: i64, ulid: Ulid) -> Self {
        Self {
            category,
            timestamp_ms: timestamp_ms.max(0),
            ulid,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "time:{}:{:013}:{}",
            self.category.code(),
            self.timestamp_ms,
            self.ulid
        )
        .into_bytes()
    }

    pub fn prefix(category: Category) -> Vec<u8> {
        format!("time:{}:", category.code()).into_bytes()
    }

    /// Scan start for rows at or after `start_ms`
    pub fn prefix_start(category: Category, start_ms: i64) -> Vec<u8> {
        format!("time:{}:{:013}:", category.code(), start_ms.max(0)).into_bytes()
    }
}

/// Similarity block key with a normalized pair.
/// Format: block:{category_code}:{topic_a}:{topic_b}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockKey {
    pub category: Category,
    pub topic_a: String,
    pub topic_b: String,
}

impl BlockKey {
    /// Create a key; the pair is ordered so both directions map to one key.
    pub fn new(category: Category, first: &str, second: &str) -> Self {
        let (topic_a, topic_b) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };
        Self {
            category,
            topic_a: topic_a.to_string(),
            topic_b: topic_b.to_string(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "block:{}:{}:{}",
            self.category.code(),
            self.topic_a,
            self.topic_b
        )
        .into_bytes()
    }

    pub fn prefix(category: Category) -> Vec<u8> {
        format!("block:{}:", category.code()).into_bytes()
    }

    pub fn prefix_all() -> &'static [u8] {
        b"block:"
    }
}

/// Category lease key.
/// Format: lease:{category_code}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseKey {
    pub category: Category,
}

impl LeaseKey {
    pub fn new(category: Category) -> Self {
        Self { category }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("lease:{}", self.category.code()).into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_key_roundtrip() {
        let key = HistoryKey::new("01HRQ7D5KQ", 1_706_540_400_000, Ulid::new());
        let decoded = HistoryKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(key, decoded);
    }

    #[test]
    fn test_history_keys_sort_by_time() {
        let early = HistoryKey::new("t1", 1_000, Ulid::new());
        let late = HistoryKey::new("t1", 2_000, Ulid::new());
        assert!(early.to_bytes() < late.to_bytes());
        assert!(early.to_bytes().starts_with(&HistoryKey::prefix("t1")));
    }

    #[test]
    fn test_timeline_prefix_start_orders_before_rows() {
        let row = TimelineKey::new(Category::AiAutomation, 5_000, Ulid::new());
        assert!(TimelineKey::prefix_start(Category::AiAutomation, 5_000) <= row.to_bytes());
        assert!(TimelineKey::prefix_start(Category::AiAutomation, 5_001) > row.to_bytes());
    }

    #[test]
    fn test_block_key_is_order_independent() {
        let ab = BlockKey::new(Category::WebDevelopment, "a", "b");
        let ba = BlockKey::new(Category::WebDevelopment, "b", "a");
        assert_eq!(ab.to_bytes(), ba.to_bytes());
        assert_eq!(ab.to_bytes(), b"block:web:a:b".to_vec());
    }

    #[test]
    fn test_category_index_key_roundtrip() {
        let key = CategoryIndexKey::new(Category::DigitalMarketing, "01ABC");
        assert_eq!(key.to_bytes(), b"cat:mkt:01ABC".to_vec());
        assert_eq!(CategoryIndexKey::from_bytes(&key.to_bytes()).unwrap(), key);
    }

    #[test]
    fn test_invalid_keys_rejected() {
        assert!(HistoryKey::from_bytes(b"hist:t1:notanumber:x").is_err());
        assert!(CategoryIndexKey::from_bytes(b"cat:zzz:t1").is_err());
        assert!(CategoryIndexKey::from_bytes(b"topic:t1").is_err());
    }
}
