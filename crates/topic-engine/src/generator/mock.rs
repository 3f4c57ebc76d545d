//! Mock generator for testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use topic_types::Category;

use super::{GeneratorError, TopicGenerator};

/// Generator returning a fixed list of proposals.
pub struct MockTopicGenerator {
    proposals: Vec<String>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockTopicGenerator {
    /// Generator answering every call with `proposals`.
    pub fn new<I, S>(proposals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            proposals: proposals.into_iter().map(Into::into).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Generator whose every call fails.
    pub fn failing() -> Self {
        Self {
            proposals: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `propose` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTopicGenerator {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

#[async_trait]
impl TopicGenerator for MockTopicGenerator {
    async fn propose(
        &self,
        _category: Category,
        _count: usize,
    ) -> Result<Vec<String>, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GeneratorError::Api("mock generator failure".to_string()));
        }
        Ok(self.proposals.clone())
    }
}
