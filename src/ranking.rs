/// View counting and the most-viewed ranking
///
/// Each detail view bumps a per-image counter and the image's score in a
/// global sorted set. Both increments are issued as one atomic unit against
/// the counter store; a periodic reconciliation pass resets each score to
/// its counter value in case the two ever drift.
use crate::{
    counter::{CounterKeys, CounterStore},
    error::BookmarksResult,
    images::{Image, ImageStore},
    metrics,
};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, warn};

/// Ranking engine over the counter store and the canonical image store
#[derive(Clone)]
pub struct ViewRanking {
    store: Arc<dyn CounterStore>,
    images: ImageStore,
    keys: CounterKeys,
}

impl ViewRanking {
    pub fn new(store: Arc<dyn CounterStore>, images: ImageStore, keys: CounterKeys) -> Self {
        Self { store, images, keys }
    }

    /// Count one view of `image_id` and return the new total.
    ///
    /// Callers on the page-render path should treat an error as non-fatal.
    pub async fn record_view(&self, image_id: i64) -> BookmarksResult<i64> {
        let result = self
            .store
            .incr_with_rank(
                &self.keys.image_views(image_id),
                &self.keys.image_ranking(),
                &image_id.to_string(),
            )
            .await;

        metrics::record_view(result.is_ok());
        result
    }

    /// Top `n` images by view count, most viewed first.
    ///
    /// Identifiers with no matching image are dropped.
    pub async fn top_ranked(&self, n: usize) -> BookmarksResult<Vec<Image>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let stop = isize::try_from(n - 1).unwrap_or(isize::MAX);
        let members = self
            .store
            .zrevrange(&self.keys.image_ranking(), 0, stop)
            .await?;

        let mut seen = HashSet::with_capacity(members.len());
        let mut ids = Vec::with_capacity(members.len());
        for member in &members {
            match member.parse::<i64>() {
                Ok(id) if seen.insert(id) => ids.push(id),
                Ok(_) => {}
                Err(_) => warn!(member = %member, "Ignoring malformed ranking member"),
            }
        }

        let mut resolved = self.images.get_many(&ids).await?;
        let ranked: Vec<Image> = ids.iter().filter_map(|id| resolved.remove(id)).collect();

        if ranked.len() < ids.len() {
            debug!(
                dropped = ids.len() - ranked.len(),
                "Ranking referenced images that no longer exist"
            );
        }

        Ok(ranked)
    }

    /// Reset each image's ranking score to its counter value.
    ///
    /// Each read-and-write is atomic in the store, so views recorded while
    /// this runs are never overwritten. Returns how many scores were written.
    pub async fn reconcile(&self, image_ids: &[i64]) -> BookmarksResult<usize> {
        let ranking = self.keys.image_ranking();
        let mut written = 0;

        for &id in image_ids {
            let synced = self
                .store
                .sync_rank(&self.keys.image_views(id), &ranking, &id.to_string())
                .await?;
            if synced.is_some() {
                written += 1;
            }
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        counter::{MemoryCounterStore, UnreachableStore},
        db::{insert_test_image, insert_test_user, test_pool},
        error::BookmarksError,
    };
    use async_trait::async_trait;

    /// Memory store that records one more view of `member` right after every plain `GET`
    struct ViewOnReadStore {
        inner: MemoryCounterStore,
        set: String,
        member: String,
    }

    #[async_trait]
    impl CounterStore for ViewOnReadStore {
        async fn incr(&self, key: &str) -> BookmarksResult<i64> {
            self.inner.incr(key).await
        }

        async fn get(&self, key: &str) -> BookmarksResult<Option<i64>> {
            let value = self.inner.get(key).await?;
            self.inner.incr_with_rank(key, &self.set, &self.member).await?;
            Ok(value)
        }

        async fn zincrby(&self, set: &str, member: &str, delta: f64) -> BookmarksResult<f64> {
            self.inner.zincrby(set, member, delta).await
        }

        async fn zadd(&self, set: &str, member: &str, score: f64) -> BookmarksResult<()> {
            self.inner.zadd(set, member, score).await
        }

        async fn zrevrange(&self, set: &str, start: isize, stop: isize) -> BookmarksResult<Vec<String>> {
            self.inner.zrevrange(set, start, stop).await
        }

        async fn incr_with_rank(&self, counter_key: &str, set: &str, member: &str) -> BookmarksResult<i64> {
            self.inner.incr_with_rank(counter_key, set, member).await
        }

        async fn sync_rank(&self, counter_key: &str, set: &str, member: &str) -> BookmarksResult<Option<i64>> {
            self.inner.sync_rank(counter_key, set, member).await
        }

        async fn ping(&self) -> BookmarksResult<()> {
            self.inner.ping().await
        }
    }

    async fn views(store: &MemoryCounterStore, image_id: i64) -> i64 {
        store
            .get(&CounterKeys::new("test:").image_views(image_id))
            .await
            .unwrap()
            .unwrap_or(0)
    }

    async fn setup() -> (sqlx::SqlitePool, Arc<MemoryCounterStore>, ViewRanking) {
        let db = test_pool().await;
        let store = Arc::new(MemoryCounterStore::new());
        let ranking = ViewRanking::new(
            store.clone(),
            ImageStore::new(db.clone()),
            CounterKeys::new("test:"),
        );
        (db, store, ranking)
    }

    #[tokio::test]
    async fn test_most_viewed_first() {
        let (db, store, ranking) = setup().await;
        let user = insert_test_user(&db, "alice").await;
        let a = insert_test_image(&db, user, "A").await;
        let b = insert_test_image(&db, user, "B").await;

        for _ in 0..3 {
            ranking.record_view(b).await.unwrap();
        }
        for expected in 1..=5 {
            assert_eq!(ranking.record_view(a).await.unwrap(), expected);
        }

        let top: Vec<i64> = ranking.top_ranked(2).await.unwrap().iter().map(|i| i.id).collect();
        assert_eq!(top, vec![a, b]);
        assert_eq!(views(&store, a).await, 5);
        assert_eq!(views(&store, 9999).await, 0);
    }

    #[tokio::test]
    async fn test_deleted_image_is_dropped() {
        let (db, _store, ranking) = setup().await;
        let user = insert_test_user(&db, "alice").await;
        let a = insert_test_image(&db, user, "A").await;
        let c = insert_test_image(&db, user, "C").await;

        ranking.record_view(a).await.unwrap();
        ranking.record_view(c).await.unwrap();
        ranking.record_view(c).await.unwrap();

        sqlx::query("DELETE FROM image WHERE id = ?1")
            .bind(c)
            .execute(&db)
            .await
            .unwrap();

        let top: Vec<i64> = ranking.top_ranked(10).await.unwrap().iter().map(|i| i.id).collect();
        assert_eq!(top, vec![a]);
    }

    #[tokio::test]
    async fn test_top_ranked_bounds() {
        let (db, store, ranking) = setup().await;
        let user = insert_test_user(&db, "alice").await;
        let mut ids = Vec::new();
        for (i, title) in ["One", "Two", "Three", "Four"].into_iter().enumerate() {
            let id = insert_test_image(&db, user, title).await;
            for _ in 0..=i {
                ranking.record_view(id).await.unwrap();
            }
            ids.push(id);
        }
        store.zadd("test:image_ranking", "not-a-number", 100.0).await.unwrap();

        assert!(ranking.top_ranked(0).await.unwrap().is_empty());

        let top = ranking.top_ranked(3).await.unwrap();
        assert!(top.len() <= 3);
        let top_ids: Vec<i64> = top.iter().map(|i| i.id).collect();
        let unique: HashSet<i64> = top_ids.iter().copied().collect();
        assert_eq!(unique.len(), top_ids.len());

        let mut previous = i64::MAX;
        for id in &top_ids {
            let count = views(&store, *id).await;
            assert!(count < previous);
            previous = count;
        }

        let all: Vec<i64> = ranking.top_ranked(50).await.unwrap().iter().map(|i| i.id).collect();
        assert_eq!(all, ids.iter().rev().copied().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_reconcile_resets_scores() {
        let (db, store, ranking) = setup().await;
        let user = insert_test_user(&db, "alice").await;
        let a = insert_test_image(&db, user, "A").await;
        let b = insert_test_image(&db, user, "B").await;

        ranking.record_view(a).await.unwrap();
        ranking.record_view(b).await.unwrap();
        ranking.record_view(b).await.unwrap();

        // Simulate a rank increment that landed without its counter increment
        store.zincrby("test:image_ranking", &a.to_string(), 10.0).await.unwrap();
        let top: Vec<i64> = ranking.top_ranked(2).await.unwrap().iter().map(|i| i.id).collect();
        assert_eq!(top, vec![a, b]);

        assert_eq!(ranking.reconcile(&[a, b, 9999]).await.unwrap(), 2);
        let top: Vec<i64> = ranking.top_ranked(2).await.unwrap().iter().map(|i| i.id).collect();
        assert_eq!(top, vec![b, a]);
    }

    #[tokio::test]
    async fn test_reconcile_does_not_lose_interleaved_views() {
        let db = test_pool().await;
        let user = insert_test_user(&db, "alice").await;
        let a = insert_test_image(&db, user, "A").await;

        let keys = CounterKeys::new("test:");
        let store = Arc::new(ViewOnReadStore {
            inner: MemoryCounterStore::new(),
            set: keys.image_ranking(),
            member: a.to_string(),
        });
        let ranking = ViewRanking::new(store.clone(), ImageStore::new(db), keys.clone());

        ranking.record_view(a).await.unwrap();
        ranking.reconcile(&[a]).await.unwrap();

        let counter = store.inner.get(&keys.image_views(a)).await.unwrap().unwrap_or(0);
        let score = store
            .inner
            .zincrby(&keys.image_ranking(), &a.to_string(), 0.0)
            .await
            .unwrap();
        assert_eq!(score, counter as f64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reconcile_concurrent_with_views() {
        let (db, store, ranking) = setup().await;
        let user = insert_test_user(&db, "alice").await;
        let a = insert_test_image(&db, user, "A").await;
        ranking.record_view(a).await.unwrap();

        let viewer = {
            let ranking = ranking.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    ranking.record_view(a).await.unwrap();
                }
            })
        };
        let reconciler = {
            let ranking = ranking.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    ranking.reconcile(&[a]).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };
        viewer.await.unwrap();
        reconciler.await.unwrap();

        let counter = views(&store, a).await;
        let score = store
            .zincrby("test:image_ranking", &a.to_string(), 0.0)
            .await
            .unwrap();
        assert_eq!(counter, 201);
        assert_eq!(score, counter as f64);
    }

    #[tokio::test]
    async fn test_unreachable_store_fails() {
        let db = test_pool().await;
        let ranking = ViewRanking::new(
            Arc::new(UnreachableStore),
            ImageStore::new(db),
            CounterKeys::new("test:"),
        );

        assert!(matches!(
            ranking.record_view(1).await,
            Err(BookmarksError::CounterStore(_))
        ));
        assert!(matches!(
            ranking.top_ranked(5).await,
            Err(BookmarksError::CounterStore(_))
        ));
    }
}
