/// Account management system
///
/// Handles user registration, login, profile edits and user lookups.

mod manager;

pub use manager::AccountManager;

use crate::actions::FeedEntry;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// User record (password hash never leaves the manager)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub date_of_birth: Option<NaiveDate>,
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub password2: String,
}

impl RegisterRequest {
    /// Both password fields must agree
    pub fn passwords_match(&self) -> bool {
        self.password == self.password2
    }
}

/// Login request; `username` may also be an email address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: User,
}

/// Profile edit request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EditProfileRequest {
    #[validate(length(max = 150))]
    pub first_name: String,
    #[validate(length(max = 150))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
}

/// Public view of another user
#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub followers: i64,
    pub following: i64,
    /// Whether the requesting user follows this one
    pub followed_by_viewer: bool,
    /// The user's own latest actions
    pub actions: Vec<FeedEntry>,
}
