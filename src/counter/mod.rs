/// View counter storage
///
/// Per-image view counters and the global ranking sorted set live in an
/// external key-value store. Redis is the production backend; an in-process
/// backend serves development setups and tests.

pub mod memory;
pub mod redis;

pub use memory::MemoryCounterStore;
pub use self::redis::RedisCounterStore;

use crate::{
    config::{CounterBackendConfig, CounterStoreConfig},
    error::BookmarksResult,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Counter store backend trait
///
/// Mirrors the handful of Redis primitives the ranking engine needs.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// `INCR key`, returning the new value
    async fn incr(&self, key: &str) -> BookmarksResult<i64>;

    /// `GET key` as an integer
    async fn get(&self, key: &str) -> BookmarksResult<Option<i64>>;

    /// `ZINCRBY set delta member`, returning the new score
    async fn zincrby(&self, set: &str, member: &str, delta: f64) -> BookmarksResult<f64>;

    /// `ZADD set score member`
    async fn zadd(&self, set: &str, member: &str, score: f64) -> BookmarksResult<()>;

    /// `ZRANGE set start stop REV`: members by descending score
    async fn zrevrange(&self, set: &str, start: isize, stop: isize) -> BookmarksResult<Vec<String>>;

    /// `INCR counter_key` and `ZINCRBY set 1 member` applied as one unit.
    ///
    /// Either both increments land or neither does. Returns the new counter value.
    async fn incr_with_rank(&self, counter_key: &str, set: &str, member: &str) -> BookmarksResult<i64>;

    /// `GET counter_key` and `ZADD set <value> member` applied as one unit.
    ///
    /// Leaves the set untouched when the counter does not exist. Returns the
    /// counter value that was written as the score.
    async fn sync_rank(&self, counter_key: &str, set: &str, member: &str) -> BookmarksResult<Option<i64>>;

    /// Check connectivity
    async fn ping(&self) -> BookmarksResult<()>;
}

/// Key layout for image views
#[derive(Debug, Clone)]
pub struct CounterKeys {
    prefix: String,
}

impl CounterKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Counter key for one image: `{prefix}image:{id}:views`
    pub fn image_views(&self, image_id: i64) -> String {
        format!("{}image:{}:views", self.prefix, image_id)
    }

    /// Sorted set ranking images by views: `{prefix}image_ranking`
    pub fn image_ranking(&self) -> String {
        format!("{}image_ranking", self.prefix)
    }
}

/// Build the configured backend
pub async fn connect(config: &CounterStoreConfig) -> BookmarksResult<Arc<dyn CounterStore>> {
    match &config.backend {
        CounterBackendConfig::Redis { url } => {
            let store = RedisCounterStore::connect(url).await?;
            Ok(Arc::new(store))
        }
        CounterBackendConfig::Memory => {
            tracing::warn!("No Redis URL configured - view counters are kept in memory");
            Ok(Arc::new(MemoryCounterStore::new()))
        }
    }
}

/// Backend that fails every call, as an unreachable Redis would
#[cfg(test)]
pub struct UnreachableStore;

#[cfg(test)]
#[async_trait]
impl CounterStore for UnreachableStore {
    async fn incr(&self, _key: &str) -> BookmarksResult<i64> {
        Err(unreachable_error())
    }

    async fn get(&self, _key: &str) -> BookmarksResult<Option<i64>> {
        Err(unreachable_error())
    }

    async fn zincrby(&self, _set: &str, _member: &str, _delta: f64) -> BookmarksResult<f64> {
        Err(unreachable_error())
    }

    async fn zadd(&self, _set: &str, _member: &str, _score: f64) -> BookmarksResult<()> {
        Err(unreachable_error())
    }

    async fn zrevrange(&self, _set: &str, _start: isize, _stop: isize) -> BookmarksResult<Vec<String>> {
        Err(unreachable_error())
    }

    async fn incr_with_rank(&self, _counter_key: &str, _set: &str, _member: &str) -> BookmarksResult<i64> {
        Err(unreachable_error())
    }

    async fn sync_rank(&self, _counter_key: &str, _set: &str, _member: &str) -> BookmarksResult<Option<i64>> {
        Err(unreachable_error())
    }

    async fn ping(&self) -> BookmarksResult<()> {
        Err(unreachable_error())
    }
}

#[cfg(test)]
fn unreachable_error() -> crate::error::BookmarksError {
    crate::error::BookmarksError::CounterStore("connection refused".to_string())
}
