//! In-process TTL cache backing the index feed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::application::cache::FeedCache;
use crate::domain::entities::FeedEntry;

struct Entry {
    value: Arc<Vec<FeedEntry>>,
    expires_at: Instant,
}

/// A small keyed store with per-entry expiry. Expired entries are dropped
/// lazily on the next lookup for their key.
#[derive(Default)]
pub struct TtlFeedCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl TtlFeedCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedCache for TtlFeedCache {
    async fn get(&self, key: &str) -> Option<Arc<Vec<FeedEntry>>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(Arc::clone(&entry.value));
                }
                Some(_) => {}
                None => return None,
            }
        }

        // The entry is stale; take the write lock and re-check before
        // removing, another task may have repopulated it.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Some(Arc::clone(&entry.value));
            }
            entries.remove(key);
        }
        None
    }

    async fn set(&self, key: &str, value: Arc<Vec<FeedEntry>>, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
