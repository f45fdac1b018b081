/// Action log with dedup-on-write
use crate::{
    actions::{Action, ActionTarget},
    db::{format_timestamp, parse_timestamp},
    error::{BookmarksError, BookmarksResult},
    metrics,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

/// Append-only store of user actions
#[derive(Clone)]
pub struct ActionLog {
    db: SqlitePool,
    /// Trailing window in which an identical action is suppressed
    dedup_window: Duration,
}

impl ActionLog {
    pub fn new(db: SqlitePool, dedup_window: Duration) -> Self {
        Self { db, dedup_window }
    }

    /// Record an action unless an identical one was logged within the dedup window.
    ///
    /// Returns `true` when a row was inserted, `false` when suppressed.
    pub async fn record_action(
        &self,
        user_id: i64,
        verb: &str,
        target: Option<ActionTarget>,
    ) -> BookmarksResult<bool> {
        self.record_action_at(user_id, verb, target, Utc::now()).await
    }

    /// Same as [`record_action`](Self::record_action) with an explicit clock.
    ///
    /// The lookup and the insert are separate statements: two concurrent calls
    /// for the same (user, verb, target) can both insert.
    pub async fn record_action_at(
        &self,
        user_id: i64,
        verb: &str,
        target: Option<ActionTarget>,
        now: DateTime<Utc>,
    ) -> BookmarksResult<bool> {
        let window_start = now.checked_sub_signed(self.dedup_window).ok_or_else(|| {
            BookmarksError::Internal("Action dedup window exceeds the supported time range".to_string())
        })?;
        let window_start = format_timestamp(window_start);

        let similar: Option<i64> = match target {
            Some(target) => {
                sqlx::query_scalar(
                    r#"
                    SELECT id FROM action
                    WHERE user_id = ?1 AND verb = ?2 AND created_at >= ?3
                      AND target_type = ?4 AND target_id = ?5
                    LIMIT 1
                    "#,
                )
                .bind(user_id)
                .bind(verb)
                .bind(&window_start)
                .bind(target.kind())
                .bind(target.id())
                .fetch_optional(&self.db)
                .await?
            }
            None => {
                // Targetless actions must never match a targeted one
                sqlx::query_scalar(
                    r#"
                    SELECT id FROM action
                    WHERE user_id = ?1 AND verb = ?2 AND created_at >= ?3
                      AND target_type IS NULL AND target_id IS NULL
                    LIMIT 1
                    "#,
                )
                .bind(user_id)
                .bind(verb)
                .bind(&window_start)
                .fetch_optional(&self.db)
                .await?
            }
        };

        if let Some(existing) = similar {
            debug!(
                user_id,
                verb,
                existing_action = existing,
                "Suppressing duplicate action"
            );
            metrics::record_action_outcome(false);
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO action (user_id, verb, created_at, target_type, target_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(user_id)
        .bind(verb)
        .bind(format_timestamp(now))
        .bind(target.map(|t| t.kind()))
        .bind(target.map(|t| t.id()))
        .execute(&self.db)
        .await?;

        metrics::record_action_outcome(true);
        Ok(true)
    }

    /// Actions performed by one user, newest first
    pub async fn list_for_user(&self, user_id: i64, limit: i64) -> BookmarksResult<Vec<Action>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, verb, created_at, target_type, target_id
            FROM action
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(action_from_row).collect()
    }

    /// Latest actions not performed by `viewer`, optionally restricted to a set of actors
    pub async fn recent(
        &self,
        viewer: i64,
        actors: &[i64],
        limit: i64,
    ) -> BookmarksResult<Vec<Action>> {
        let mut query = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            "SELECT id, user_id, verb, created_at, target_type, target_id FROM action WHERE user_id != ",
        );
        query.push_bind(viewer);

        if !actors.is_empty() {
            query.push(" AND user_id IN (");
            let mut separated = query.separated(", ");
            for actor in actors {
                separated.push_bind(*actor);
            }
            separated.push_unseparated(")");
        }

        query.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        query.push_bind(limit);

        let rows = query.build().fetch_all(&self.db).await?;
        rows.iter().map(action_from_row).collect()
    }
}

fn action_from_row(row: &SqliteRow) -> BookmarksResult<Action> {
    let target_type: Option<String> = row.try_get("target_type")?;
    let target_id: Option<i64> = row.try_get("target_id")?;

    Ok(Action {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        verb: row.try_get("verb")?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        target: ActionTarget::from_columns(target_type.as_deref(), target_id)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_test_user, test_pool};
    use chrono::TimeZone;

    async fn setup() -> (ActionLog, i64) {
        let db = test_pool().await;
        let user = insert_test_user(&db, "alice").await;
        (ActionLog::new(db, Duration::seconds(60)), user)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    async fn count_rows(log: &ActionLog) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM action")
            .fetch_one(&log.db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_within_window_is_suppressed() {
        let (log, user) = setup().await;
        let target = Some(ActionTarget::Image(5));

        let first = log.record_action_at(user, "likes", target, t0()).await.unwrap();
        let second = log
            .record_action_at(user, "likes", target, t0() + Duration::seconds(30))
            .await
            .unwrap();

        assert_eq!((first, second), (true, false));
        assert_eq!(count_rows(&log).await, 1);
    }

    #[tokio::test]
    async fn test_window_lower_bound_is_inclusive() {
        let (log, user) = setup().await;

        assert!(log.record_action_at(user, "likes", None, t0()).await.unwrap());
        let at_edge = log
            .record_action_at(user, "likes", None, t0() + Duration::seconds(60))
            .await
            .unwrap();

        assert!(!at_edge);
    }

    #[tokio::test]
    async fn test_actions_spaced_beyond_window_are_both_kept() {
        let (log, user) = setup().await;
        let target = Some(ActionTarget::User(9));

        let first = log.record_action_at(user, "is following", target, t0()).await.unwrap();
        let second = log
            .record_action_at(user, "is following", target, t0() + Duration::seconds(61))
            .await
            .unwrap();

        assert_eq!((first, second), (true, true));
        assert_eq!(count_rows(&log).await, 2);
    }

    #[tokio::test]
    async fn test_out_of_range_window_is_an_error() {
        let (log, user) = setup().await;
        let log = ActionLog::new(log.db.clone(), Duration::days(100_000_000));

        let result = log.record_action_at(user, "likes", None, t0()).await;
        assert!(matches!(result, Err(BookmarksError::Internal(_))));
        assert_eq!(count_rows(&log).await, 0);
    }

    #[tokio::test]
    async fn test_targetless_and_targeted_never_match() {
        let (log, user) = setup().await;

        assert!(log.record_action_at(user, "likes", None, t0()).await.unwrap());
        assert!(log
            .record_action_at(user, "likes", Some(ActionTarget::Image(1)), t0())
            .await
            .unwrap());
        assert!(!log.record_action_at(user, "likes", None, t0()).await.unwrap());

        let (log, user) = setup().await;
        assert!(log
            .record_action_at(user, "likes", Some(ActionTarget::Image(1)), t0())
            .await
            .unwrap());
        assert!(log.record_action_at(user, "likes", None, t0()).await.unwrap());
    }

    #[tokio::test]
    async fn test_different_target_kind_with_same_id_is_distinct() {
        let (log, user) = setup().await;

        assert!(log
            .record_action_at(user, "viewed", Some(ActionTarget::User(3)), t0())
            .await
            .unwrap());
        assert!(log
            .record_action_at(user, "viewed", Some(ActionTarget::Image(3)), t0())
            .await
            .unwrap());
        assert!(log
            .record_action_at(user, "viewed", Some(ActionTarget::Image(4)), t0())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_different_verb_or_actor_is_distinct() {
        let (log, alice) = setup().await;
        let bob = insert_test_user(&log.db, "bob").await;

        assert!(log.record_action_at(alice, "likes", None, t0()).await.unwrap());
        assert!(log.record_action_at(alice, "bookmarked image", None, t0()).await.unwrap());
        assert!(log.record_action_at(bob, "likes", None, t0()).await.unwrap());
        assert_eq!(count_rows(&log).await, 3);
    }

    #[tokio::test]
    async fn test_list_for_user_newest_first() {
        let (log, user) = setup().await;

        log.record_action_at(user, "first", None, t0()).await.unwrap();
        log.record_action_at(user, "second", Some(ActionTarget::Image(2)), t0() + Duration::seconds(5))
            .await
            .unwrap();

        let actions = log.list_for_user(user, 10).await.unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].verb, "second");
        assert_eq!(actions[0].target, Some(ActionTarget::Image(2)));
        assert_eq!(actions[1].verb, "first");
        assert_eq!(actions[1].target, None);
        assert_eq!(actions[1].created_at, t0());
    }

    #[tokio::test]
    async fn test_recent_excludes_viewer_and_filters_actors() {
        let (log, alice) = setup().await;
        let bob = insert_test_user(&log.db, "bob").await;
        let carol = insert_test_user(&log.db, "carol").await;

        log.record_action_at(alice, "mine", None, t0()).await.unwrap();
        log.record_action_at(bob, "bob's", None, t0() + Duration::seconds(1)).await.unwrap();
        log.record_action_at(carol, "carol's", None, t0() + Duration::seconds(2)).await.unwrap();

        let everyone = log.recent(alice, &[], 10).await.unwrap();
        let verbs: Vec<_> = everyone.iter().map(|a| a.verb.as_str()).collect();
        assert_eq!(verbs, vec!["carol's", "bob's"]);

        let followed = log.recent(alice, &[bob], 10).await.unwrap();
        assert_eq!(followed.len(), 1);
        assert_eq!(followed[0].user_id, bob);

        let limited = log.recent(alice, &[], 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].user_id, carol);
    }
}
