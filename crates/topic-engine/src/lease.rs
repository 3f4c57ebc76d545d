//! Per-category selection lease.
//!
//! Two concurrent selections for the same category can return the same
//! topic. Callers that run several publishers take the category lease
//! before selecting and release it after recording usage.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use topic_types::Category;
use ulid::Ulid;

/// A held lease on one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLease {
    pub lease_id: String,
    pub category: Category,
    /// Free-form identity of the holder (worker name, hostname)
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CategoryLease {
    pub fn new(
        category: Category,
        holder: impl Into<String>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            lease_id: Ulid::new().to_string(),
            category,
            holder: holder.into(),
            acquired_at: now,
            expires_at: now + ttl,
        }
    }

    /// True once `now` has reached the expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
