/// Likes and the cached like counter
use crate::{
    error::{BookmarksError, BookmarksResult},
    metrics,
};
use sqlx::{Sqlite, SqlitePool, Transaction};

/// Maintains the `image_like` relation and `image.total_likes`.
///
/// Every membership change recounts the relation inside the same
/// transaction, so `total_likes` always equals the number of likers once the
/// call returns.
#[derive(Clone)]
pub struct LikeManager {
    db: SqlitePool,
}

impl LikeManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Add `user_id` to the likers of `image_id`. Returns the new like count.
    pub async fn like(&self, image_id: i64, user_id: i64) -> BookmarksResult<i64> {
        let mut tx = self.db.begin().await?;
        ensure_image_exists(&mut tx, image_id).await?;

        sqlx::query(
            "INSERT INTO image_like (image_id, user_id) VALUES (?1, ?2)
             ON CONFLICT(image_id, user_id) DO NOTHING",
        )
        .bind(image_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let total = recount(&mut tx, image_id).await?;
        tx.commit().await?;

        metrics::record_like("like");
        Ok(total)
    }

    /// Remove `user_id` from the likers of `image_id`. Returns the new like count.
    ///
    /// Removing a user who never liked the image still recounts and saves.
    pub async fn unlike(&self, image_id: i64, user_id: i64) -> BookmarksResult<i64> {
        let mut tx = self.db.begin().await?;
        ensure_image_exists(&mut tx, image_id).await?;

        sqlx::query("DELETE FROM image_like WHERE image_id = ?1 AND user_id = ?2")
            .bind(image_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let total = recount(&mut tx, image_id).await?;
        tx.commit().await?;

        metrics::record_like("unlike");
        Ok(total)
    }

    /// Ids of the users who like an image
    pub async fn liked_by(&self, image_id: i64) -> BookmarksResult<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT user_id FROM image_like WHERE image_id = ?1 ORDER BY user_id",
        )
        .bind(image_id)
        .fetch_all(&self.db)
        .await?;
        Ok(ids)
    }

    /// Recompute `total_likes` for every image. Returns how many rows were out of date.
    pub async fn recount_all(&self) -> BookmarksResult<u64> {
        let fixed = sqlx::query(
            r#"
            UPDATE image
            SET total_likes = (SELECT COUNT(*) FROM image_like WHERE image_like.image_id = image.id)
            WHERE total_likes != (SELECT COUNT(*) FROM image_like WHERE image_like.image_id = image.id)
            "#,
        )
        .execute(&self.db)
        .await?
        .rows_affected();
        Ok(fixed)
    }
}

async fn ensure_image_exists(tx: &mut Transaction<'_, Sqlite>, image_id: i64) -> BookmarksResult<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM image WHERE id = ?1")
        .bind(image_id)
        .fetch_optional(&mut **tx)
        .await?;

    match exists {
        Some(_) => Ok(()),
        None => Err(BookmarksError::NotFound(format!("Image {} not found", image_id))),
    }
}

async fn recount(tx: &mut Transaction<'_, Sqlite>, image_id: i64) -> BookmarksResult<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM image_like WHERE image_id = ?1")
        .bind(image_id)
        .fetch_one(&mut **tx)
        .await?;

    sqlx::query("UPDATE image SET total_likes = ?1 WHERE id = ?2")
        .bind(total)
        .bind(image_id)
        .execute(&mut **tx)
        .await?;

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_test_image, insert_test_user, test_pool};

    async fn stored_total(db: &SqlitePool, image_id: i64) -> i64 {
        sqlx::query_scalar("SELECT total_likes FROM image WHERE id = ?1")
            .bind(image_id)
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_like_then_unlike_returns_to_zero() {
        let db = test_pool().await;
        let user = insert_test_user(&db, "u").await;
        let image = insert_test_image(&db, user, "I").await;
        let likes = LikeManager::new(db.clone());

        assert_eq!(likes.like(image, user).await.unwrap(), 1);
        assert_eq!(stored_total(&db, image).await, 1);

        assert_eq!(likes.unlike(image, user).await.unwrap(), 0);
        assert_eq!(stored_total(&db, image).await, 0);
        assert!(likes.liked_by(image).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cached_count_tracks_membership() {
        let db = test_pool().await;
        let owner = insert_test_user(&db, "owner").await;
        let image = insert_test_image(&db, owner, "Photo").await;
        let mut users = Vec::new();
        for name in ["a", "b", "c"] {
            users.push(insert_test_user(&db, name).await);
        }
        let likes = LikeManager::new(db.clone());

        // like a, like b, like a again, unlike c (never liked), like c, unlike a
        let ops: [(bool, usize); 6] = [(true, 0), (true, 1), (true, 0), (false, 2), (true, 2), (false, 0)];
        for (like, idx) in ops {
            let total = if like {
                likes.like(image, users[idx]).await.unwrap()
            } else {
                likes.unlike(image, users[idx]).await.unwrap()
            };

            let members = likes.liked_by(image).await.unwrap();
            assert_eq!(total, members.len() as i64);
            assert_eq!(stored_total(&db, image).await, members.len() as i64);
        }

        assert_eq!(likes.liked_by(image).await.unwrap(), vec![users[1], users[2]]);
    }

    #[tokio::test]
    async fn test_like_missing_image() {
        let db = test_pool().await;
        let user = insert_test_user(&db, "u").await;
        let likes = LikeManager::new(db);

        let err = likes.like(404, user).await.unwrap_err();
        assert!(matches!(err, BookmarksError::NotFound(_)));
        assert!(matches!(likes.unlike(404, user).await, Err(BookmarksError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_recount_all_repairs_drift() {
        let db = test_pool().await;
        let user = insert_test_user(&db, "u").await;
        let image = insert_test_image(&db, user, "I").await;
        let likes = LikeManager::new(db.clone());

        likes.like(image, user).await.unwrap();
        sqlx::query("UPDATE image SET total_likes = 17 WHERE id = ?1")
            .bind(image)
            .execute(&db)
            .await
            .unwrap();

        assert_eq!(likes.recount_all().await.unwrap(), 1);
        assert_eq!(stored_total(&db, image).await, 1);
        assert_eq!(likes.recount_all().await.unwrap(), 0);
    }
}
