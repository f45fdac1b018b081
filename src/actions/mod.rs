/// Activity stream
///
/// Append-only log of what users do ("is following", "likes", ...), with
/// dedup-on-write so that repeated identical actions inside a short window
/// produce a single entry.

pub mod feed;
pub mod log;

pub use feed::FeedEntry;
pub use log::ActionLog;

use crate::error::{BookmarksError, BookmarksResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The entity an action refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ActionTarget {
    User(i64),
    Image(i64),
}

impl ActionTarget {
    /// Value stored in `action.target_type`
    pub fn kind(&self) -> &'static str {
        match self {
            ActionTarget::User(_) => "user",
            ActionTarget::Image(_) => "image",
        }
    }

    /// Value stored in `action.target_id`
    pub fn id(&self) -> i64 {
        match self {
            ActionTarget::User(id) | ActionTarget::Image(id) => *id,
        }
    }

    /// Rebuild a target from its stored column pair.
    ///
    /// The pair must be both present or both absent.
    pub fn from_columns(kind: Option<&str>, id: Option<i64>) -> BookmarksResult<Option<Self>> {
        match (kind, id) {
            (None, None) => Ok(None),
            (Some("user"), Some(id)) => Ok(Some(ActionTarget::User(id))),
            (Some("image"), Some(id)) => Ok(Some(ActionTarget::Image(id))),
            (Some(other), Some(_)) => Err(BookmarksError::Internal(format!(
                "Unknown action target type: {}",
                other
            ))),
            _ => Err(BookmarksError::Internal(
                "Action target type and id must be set together".to_string(),
            )),
        }
    }
}

/// A recorded action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: i64,
    pub user_id: i64,
    pub verb: String,
    pub created_at: DateTime<Utc>,
    pub target: Option<ActionTarget>,
}

/// Verbs written by the HTTP handlers
pub mod verbs {
    pub const CREATED_ACCOUNT: &str = "has created an account";
    pub const FOLLOWS: &str = "is following";
    pub const BOOKMARKED_IMAGE: &str = "bookmarked image";
    pub const LIKES: &str = "likes";
}
