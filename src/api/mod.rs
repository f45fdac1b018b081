/// API routes and handlers
pub mod account;
pub mod health;
pub mod images;
pub mod middleware;

use crate::context::AppContext;
use axum::Router;
use serde::{Deserialize, Serialize};

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(account::routes())
        .merge(images::routes())
}

/// Body of the follow and like toggles
#[derive(Debug, Clone, Deserialize)]
pub struct ToggleRequest {
    pub id: Option<i64>,
    pub action: Option<String>,
}

/// `{"status": "ok" | "error"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    pub fn error() -> Self {
        Self {
            status: "error".to_string(),
        }
    }
}
