//! Feed cache interface.
//!
//! Read handlers receive the cache as an injected trait object so tests can
//! substitute doubles. The index page is the only cached read: the full
//! unfiltered feed is stored under a fixed key for a short TTL, and writes do
//! not invalidate it. A post created right after population stays off the
//! index until the entry expires; that staleness is part of the contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entities::FeedEntry;

/// Fixed key for the unfiltered index feed.
pub const FEED_INDEX_KEY: &str = "feed:index";

/// Default entry lifetime for the index feed.
pub const DEFAULT_FEED_TTL: Duration = Duration::from_secs(20);

#[async_trait]
pub trait FeedCache: Send + Sync {
    /// The cached collection when present and unexpired. A `None` from an
    /// unavailable or cold cache must fall through to a direct query; it can
    /// never fail the request.
    async fn get(&self, key: &str) -> Option<Arc<Vec<FeedEntry>>>;

    async fn set(&self, key: &str, value: Arc<Vec<FeedEntry>>, ttl: Duration);

    /// Drop every entry. Used operationally and by tests; the write path
    /// deliberately never calls this.
    async fn clear(&self);
}

/// A cache that stores nothing, exercising the fall-through path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFeedCache;

#[async_trait]
impl FeedCache for NoopFeedCache {
    async fn get(&self, _key: &str) -> Option<Arc<Vec<FeedEntry>>> {
        None
    }

    async fn set(&self, _key: &str, _value: Arc<Vec<FeedEntry>>, _ttl: Duration) {}

    async fn clear(&self) {}
}
