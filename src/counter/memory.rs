/// In-process counter store backend
use crate::{counter::CounterStore, error::BookmarksResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct State {
    counters: HashMap<String, i64>,
    sorted_sets: HashMap<String, HashMap<String, f64>>,
}

/// Counter store held in process memory.
///
/// One lock guards every key, so `incr_with_rank` and `sync_rank` are atomic.
#[derive(Default)]
pub struct MemoryCounterStore {
    state: Mutex<State>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr(&self, key: &str) -> BookmarksResult<i64> {
        let mut state = self.state.lock().await;
        let value = state.counters.entry(key.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn get(&self, key: &str) -> BookmarksResult<Option<i64>> {
        let state = self.state.lock().await;
        Ok(state.counters.get(key).copied())
    }

    async fn zincrby(&self, set: &str, member: &str, delta: f64) -> BookmarksResult<f64> {
        let mut state = self.state.lock().await;
        let score = state
            .sorted_sets
            .entry(set.to_string())
            .or_default()
            .entry(member.to_string())
            .or_insert(0.0);
        *score += delta;
        Ok(*score)
    }

    async fn zadd(&self, set: &str, member: &str, score: f64) -> BookmarksResult<()> {
        let mut state = self.state.lock().await;
        state
            .sorted_sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zrevrange(&self, set: &str, start: isize, stop: isize) -> BookmarksResult<Vec<String>> {
        let state = self.state.lock().await;
        let Some(members) = state.sorted_sets.get(set) else {
            return Ok(Vec::new());
        };

        // Redis orders equal scores by member, reversed for REV
        let mut ranked: Vec<(&String, f64)> = members.iter().map(|(m, s)| (m, *s)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.0.cmp(a.0)));

        let len = ranked.len() as isize;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if start > stop || start >= len {
            return Ok(Vec::new());
        }

        Ok(ranked[start as usize..=stop as usize]
            .iter()
            .map(|(member, _)| (*member).clone())
            .collect())
    }

    async fn incr_with_rank(&self, counter_key: &str, set: &str, member: &str) -> BookmarksResult<i64> {
        let mut state = self.state.lock().await;

        let count = state.counters.entry(counter_key.to_string()).or_insert(0);
        *count += 1;
        let count = *count;

        *state
            .sorted_sets
            .entry(set.to_string())
            .or_default()
            .entry(member.to_string())
            .or_insert(0.0) += 1.0;

        Ok(count)
    }

    async fn sync_rank(&self, counter_key: &str, set: &str, member: &str) -> BookmarksResult<Option<i64>> {
        let mut state = self.state.lock().await;

        let Some(views) = state.counters.get(counter_key).copied() else {
            return Ok(None);
        };

        state
            .sorted_sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string(), views as f64);

        Ok(Some(views))
    }

    async fn ping(&self) -> BookmarksResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_incr_and_get() {
        let store = MemoryCounterStore::new();
        assert_eq!(store.get("views").await.unwrap(), None);
        assert_eq!(store.incr("views").await.unwrap(), 1);
        assert_eq!(store.incr("views").await.unwrap(), 2);
        assert_eq!(store.get("views").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_zrevrange_orders_by_score() {
        let store = MemoryCounterStore::new();
        store.zincrby("rank", "a", 5.0).await.unwrap();
        store.zincrby("rank", "b", 3.0).await.unwrap();
        store.zincrby("rank", "c", 9.0).await.unwrap();

        assert_eq!(store.zrevrange("rank", 0, -1).await.unwrap(), vec!["c", "a", "b"]);
        assert_eq!(store.zrevrange("rank", 0, 1).await.unwrap(), vec!["c", "a"]);
        assert_eq!(store.zrevrange("rank", 1, 10).await.unwrap(), vec!["a", "b"]);
        assert!(store.zrevrange("rank", 5, 10).await.unwrap().is_empty());
        assert!(store.zrevrange("missing", 0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zadd_overwrites_score() {
        let store = MemoryCounterStore::new();
        store.zincrby("rank", "a", 1.0).await.unwrap();
        store.zincrby("rank", "b", 2.0).await.unwrap();
        store.zadd("rank", "a", 10.0).await.unwrap();

        assert_eq!(store.zrevrange("rank", 0, -1).await.unwrap(), vec!["a", "b"]);
        assert_eq!(store.zincrby("rank", "a", 1.0).await.unwrap(), 11.0);
    }

    #[tokio::test]
    async fn test_incr_with_rank_moves_both() {
        let store = MemoryCounterStore::new();
        assert_eq!(store.incr_with_rank("v:1", "rank", "1").await.unwrap(), 1);
        assert_eq!(store.incr_with_rank("v:1", "rank", "1").await.unwrap(), 2);

        assert_eq!(store.get("v:1").await.unwrap(), Some(2));
        assert_eq!(store.zincrby("rank", "1", 0.0).await.unwrap(), 2.0);
    }

    #[tokio::test]
    async fn test_sync_rank_copies_counter() {
        let store = MemoryCounterStore::new();
        assert_eq!(store.sync_rank("v:1", "rank", "1").await.unwrap(), None);
        assert!(store.zrevrange("rank", 0, -1).await.unwrap().is_empty());

        store.incr("v:1").await.unwrap();
        store.incr("v:1").await.unwrap();
        store.zincrby("rank", "1", 40.0).await.unwrap();

        assert_eq!(store.sync_rank("v:1", "rank", "1").await.unwrap(), Some(2));
        assert_eq!(store.zincrby("rank", "1", 0.0).await.unwrap(), 2.0);
    }
}
