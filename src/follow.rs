/// Follow graph
///
/// Directional user-to-user edges stored in the `contact` table, one row per
/// (follower, followee) pair.
use crate::{db::format_timestamp, error::BookmarksResult, metrics};
use chrono::Utc;
use sqlx::SqlitePool;

/// Accessor for the `contact` relation
#[derive(Clone)]
pub struct FollowGraph {
    db: SqlitePool,
}

impl FollowGraph {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Get-or-create the edge `user_from -> user_to`.
    ///
    /// Returns `true` if the edge was created by this call.
    pub async fn follow(&self, user_from: i64, user_to: i64) -> BookmarksResult<bool> {
        let created = sqlx::query(
            r#"
            INSERT INTO contact (user_from, user_to, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_from, user_to) DO NOTHING
            "#,
        )
        .bind(user_from)
        .bind(user_to)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.db)
        .await?
        .rows_affected()
            > 0;

        metrics::record_follow("follow");
        Ok(created)
    }

    /// Remove the edge if present. Returns `true` if a row was deleted.
    pub async fn unfollow(&self, user_from: i64, user_to: i64) -> BookmarksResult<bool> {
        let deleted = sqlx::query("DELETE FROM contact WHERE user_from = ?1 AND user_to = ?2")
            .bind(user_from)
            .bind(user_to)
            .execute(&self.db)
            .await?
            .rows_affected()
            > 0;

        metrics::record_follow("unfollow");
        Ok(deleted)
    }

    pub async fn is_following(&self, user_from: i64, user_to: i64) -> BookmarksResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM contact WHERE user_from = ?1 AND user_to = ?2")
                .bind(user_from)
                .bind(user_to)
                .fetch_one(&self.db)
                .await?;
        Ok(count > 0)
    }

    /// Ids of the users `user` follows, most recent first
    pub async fn following_ids(&self, user: i64) -> BookmarksResult<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT user_to FROM contact WHERE user_from = ?1 ORDER BY created_at DESC",
        )
        .bind(user)
        .fetch_all(&self.db)
        .await?;
        Ok(ids)
    }

    pub async fn follower_count(&self, user: i64) -> BookmarksResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM contact WHERE user_to = ?1")
            .bind(user)
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    pub async fn following_count(&self, user: i64) -> BookmarksResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM contact WHERE user_from = ?1")
            .bind(user)
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}
