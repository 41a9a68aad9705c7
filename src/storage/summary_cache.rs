//! Summary Cache
//!
//! Process-lifetime map from file uuid to its final AI summary text.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Shared summary cache. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct SummaryCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl SummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, uuid: &str) -> Option<String> {
        self.entries.read().await.get(uuid).cloned()
    }

    pub async fn contains(&self, uuid: &str) -> bool {
        self.entries.read().await.contains_key(uuid)
    }

    /// Store the final text for `uuid`, replacing any earlier summary.
    pub async fn insert(&self, uuid: impl Into<String>, summary: impl Into<String>) {
        self.entries.write().await.insert(uuid.into(), summary.into());
    }

    /// Store the text produced by `produce` while holding the write lock.
    /// Readers wait for the outcome; `None` leaves the cache untouched.
    pub async fn insert_with(
        &self,
        uuid: impl Into<String>,
        produce: impl FnOnce() -> Option<String>,
    ) -> bool {
        let mut entries = self.entries.write().await;
        match produce() {
            Some(summary) => {
                entries.insert(uuid.into(), summary);
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
