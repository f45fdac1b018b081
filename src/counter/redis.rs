/// Redis counter store backend
use crate::{
    counter::CounterStore,
    error::{BookmarksError, BookmarksResult},
};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use tracing::{debug, error, info, warn};

/// Copies a counter into a sorted-set score in one server-side step
const SYNC_RANK_SCRIPT: &str = r#"
    local views = redis.call('GET', KEYS[1])
    if views then
        redis.call('ZADD', KEYS[2], views, ARGV[1])
    end
    return views
"#;

/// Counter store backed by a Redis server
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: ConnectionManager,
    sync_rank_script: Script,
}

impl RedisCounterStore {
    /// Connect to Redis
    pub async fn connect(redis_url: &str) -> BookmarksResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = Client::open(redis_url).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            BookmarksError::CounterStore(format!("Redis client creation failed: {}", e))
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to connect to Redis: {}", e);
            BookmarksError::CounterStore(format!("Redis connection failed: {}", e))
        })?;

        info!("Redis connection established");

        Ok(Self {
            connection,
            sync_rank_script: Script::new(SYNC_RANK_SCRIPT),
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str) -> BookmarksResult<i64> {
        let mut conn = self.connection.clone();
        let value: i64 = conn.incr(key, 1).await.map_err(|e| {
            warn!("Redis INCR failed for {}: {}", key, e);
            BookmarksError::from(e)
        })?;
        Ok(value)
    }

    async fn get(&self, key: &str) -> BookmarksResult<Option<i64>> {
        let mut conn = self.connection.clone();
        let value: Option<i64> = conn.get(key).await.map_err(|e| {
            warn!("Redis GET failed for {}: {}", key, e);
            BookmarksError::from(e)
        })?;
        Ok(value)
    }

    async fn zincrby(&self, set: &str, member: &str, delta: f64) -> BookmarksResult<f64> {
        let mut conn = self.connection.clone();
        let score: f64 = conn.zincr(set, member, delta).await.map_err(|e| {
            warn!("Redis ZINCRBY failed for {} {}: {}", set, member, e);
            BookmarksError::from(e)
        })?;
        Ok(score)
    }

    async fn zadd(&self, set: &str, member: &str, score: f64) -> BookmarksResult<()> {
        let mut conn = self.connection.clone();
        let _: i64 = conn.zadd(set, member, score).await.map_err(|e| {
            warn!("Redis ZADD failed for {} {}: {}", set, member, e);
            BookmarksError::from(e)
        })?;
        Ok(())
    }

    async fn zrevrange(&self, set: &str, start: isize, stop: isize) -> BookmarksResult<Vec<String>> {
        let mut conn = self.connection.clone();
        let members: Vec<String> = conn.zrevrange(set, start, stop).await.map_err(|e| {
            warn!("Redis ZREVRANGE failed for {}: {}", set, e);
            BookmarksError::from(e)
        })?;
        Ok(members)
    }

    async fn incr_with_rank(&self, counter_key: &str, set: &str, member: &str) -> BookmarksResult<i64> {
        debug!("Redis MULTI INCR {} / ZINCRBY {} 1 {}", counter_key, set, member);

        let mut conn = self.connection.clone();
        let (count, _score): (i64, f64) = redis::pipe()
            .atomic()
            .incr(counter_key, 1)
            .zincr(set, member, 1)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!("Redis view increment failed for {}: {}", counter_key, e);
                BookmarksError::from(e)
            })?;

        Ok(count)
    }

    async fn sync_rank(&self, counter_key: &str, set: &str, member: &str) -> BookmarksResult<Option<i64>> {
        let mut conn = self.connection.clone();
        let views: Option<i64> = self
            .sync_rank_script
            .key(counter_key)
            .key(set)
            .arg(member)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                warn!("Redis rank sync failed for {}: {}", counter_key, e);
                BookmarksError::from(e)
            })?;

        Ok(views)
    }

    async fn ping(&self) -> BookmarksResult<()> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await.map_err(|e| {
            error!("Redis PING failed: {}", e);
            BookmarksError::from(e)
        })?;

        if pong != "PONG" {
            return Err(BookmarksError::CounterStore(
                "Unexpected Redis PING response".to_string(),
            ));
        }

        Ok(())
    }
}
