/// Dashboard feed: actions joined with their actors and targets
use crate::{
    actions::{Action, ActionTarget},
    error::BookmarksResult,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::{HashMap, HashSet};

/// One rendered feed item
#[derive(Debug, Clone, Serialize)]
pub struct FeedEntry {
    pub id: i64,
    pub actor_id: i64,
    pub actor_username: String,
    pub verb: String,
    pub created_at: DateTime<Utc>,
    /// `None` for targetless actions and for targets that no longer exist
    pub target: Option<TargetSummary>,
}

/// What a feed item points at
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TargetSummary {
    User {
        id: i64,
        username: String,
    },
    Image {
        id: i64,
        title: String,
        slug: String,
        url: String,
    },
}

/// Resolve actors and targets for a page of actions with two batched lookups
pub async fn resolve_feed(db: &SqlitePool, actions: Vec<Action>) -> BookmarksResult<Vec<FeedEntry>> {
    let mut user_ids: HashSet<i64> = HashSet::new();
    let mut image_ids: HashSet<i64> = HashSet::new();

    for action in &actions {
        user_ids.insert(action.user_id);
        match action.target {
            Some(ActionTarget::User(id)) => {
                user_ids.insert(id);
            }
            Some(ActionTarget::Image(id)) => {
                image_ids.insert(id);
            }
            None => {}
        }
    }

    let usernames = load_usernames(db, &user_ids).await?;
    let images = load_images(db, &image_ids).await?;

    let entries = actions
        .into_iter()
        .map(|action| {
            let target = match action.target {
                Some(ActionTarget::User(id)) => usernames.get(&id).map(|username| {
                    TargetSummary::User {
                        id,
                        username: username.clone(),
                    }
                }),
                Some(ActionTarget::Image(id)) => images.get(&id).cloned(),
                None => None,
            };

            FeedEntry {
                id: action.id,
                actor_id: action.user_id,
                actor_username: usernames.get(&action.user_id).cloned().unwrap_or_default(),
                verb: action.verb,
                created_at: action.created_at,
                target,
            }
        })
        .collect();

    Ok(entries)
}

async fn load_usernames(db: &SqlitePool, ids: &HashSet<i64>) -> BookmarksResult<HashMap<i64, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query = sqlx::QueryBuilder::<sqlx::Sqlite>::new("SELECT id, username FROM users WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let rows = query.build().fetch_all(db).await?;
    let mut map = HashMap::with_capacity(rows.len());
    for row in rows {
        map.insert(row.try_get("id")?, row.try_get("username")?);
    }
    Ok(map)
}

async fn load_images(db: &SqlitePool, ids: &HashSet<i64>) -> BookmarksResult<HashMap<i64, TargetSummary>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query =
        sqlx::QueryBuilder::<sqlx::Sqlite>::new("SELECT id, title, slug, url FROM image WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let rows = query.build().fetch_all(db).await?;
    let mut map = HashMap::with_capacity(rows.len());
    for row in rows {
        let id: i64 = row.try_get("id")?;
        map.insert(
            id,
            TargetSummary::Image {
                id,
                title: row.try_get("title")?,
                slug: row.try_get("slug")?,
                url: row.try_get("url")?,
            },
        );
    }
    Ok(map)
}
