/// Authentication extractors
use crate::{api::middleware::extract_bearer_token, context::AppContext, error::BookmarksError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated user, resolved from the bearer token
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: i64,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = BookmarksError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| BookmarksError::Authentication("Missing authorization header".to_string()))?;

        let user_id = state.account_manager.validate_token(&token)?;

        // Tokens outlive deactivation; re-check the account on every request
        match state.account_manager.get_user(user_id).await? {
            Some(user) if user.is_active => Ok(AuthContext { user_id }),
            Some(_) => Err(BookmarksError::Authorization("Disabled account".to_string())),
            None => Err(BookmarksError::Authentication("Unknown account".to_string())),
        }
    }
}
