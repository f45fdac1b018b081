/// Account, dashboard and follow endpoints
use crate::{
    account::{EditProfileRequest, LoginRequest, LoginResponse, RegisterRequest, User, UserDetail},
    actions::{feed::resolve_feed, verbs, ActionTarget, FeedEntry},
    api::{StatusResponse, ToggleRequest},
    auth::AuthContext,
    context::AppContext,
    error::{BookmarksError, BookmarksResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

/// Build account routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/account/", get(dashboard))
        .route("/account/register", post(register))
        .route("/account/login", post(login))
        .route("/account/edit", post(edit_profile))
        .route("/account/users", get(user_list))
        .route("/account/users/follow", post(user_follow))
        .route("/account/users/:username", get(user_detail))
}

/// Dashboard payload: the viewer plus their activity feed
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub user: User,
    pub actions: Vec<FeedEntry>,
}

async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> BookmarksResult<(StatusCode, Json<LoginResponse>)> {
    let user = ctx.account_manager.register(&req).await?;

    ctx.action_log
        .record_action(user.id, verbs::CREATED_ACCOUNT, None)
        .await?;

    let access_token = ctx.account_manager.issue_token(user.id)?;
    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            user,
        }),
    ))
}

async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> BookmarksResult<Json<LoginResponse>> {
    let user = ctx
        .account_manager
        .authenticate(&req.username, &req.password)
        .await?;
    let access_token = ctx.account_manager.issue_token(user.id)?;

    tracing::debug!(user_id = user.id, "Issued access token");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        user,
    }))
}

/// Latest actions by other users, narrowed to followed users once the viewer follows anyone
async fn dashboard(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> BookmarksResult<Json<Dashboard>> {
    let user = ctx
        .account_manager
        .get_user(auth.user_id)
        .await?
        .ok_or_else(|| BookmarksError::NotFound("User not found".to_string()))?;

    let following = ctx.follow_graph.following_ids(auth.user_id).await?;
    let recent = ctx
        .action_log
        .recent(auth.user_id, &following, ctx.config.activity.feed_limit)
        .await?;
    let actions = resolve_feed(&ctx.db, recent).await?;

    Ok(Json(Dashboard { user, actions }))
}

async fn edit_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<EditProfileRequest>,
) -> BookmarksResult<Json<User>> {
    let user = ctx.account_manager.update_profile(auth.user_id, &req).await?;
    Ok(Json(user))
}

async fn user_list(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
) -> BookmarksResult<Json<Vec<User>>> {
    Ok(Json(ctx.account_manager.list_active().await?))
}

async fn user_detail(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(username): Path<String>,
) -> BookmarksResult<Json<UserDetail>> {
    let user = ctx
        .account_manager
        .get_active_by_username(&username)
        .await?
        .ok_or_else(|| BookmarksError::NotFound(format!("User {} not found", username)))?;

    let followers = ctx.follow_graph.follower_count(user.id).await?;
    let following = ctx.follow_graph.following_count(user.id).await?;
    let followed_by_viewer = ctx.follow_graph.is_following(auth.user_id, user.id).await?;

    let own = ctx
        .action_log
        .list_for_user(user.id, ctx.config.activity.feed_limit)
        .await?;
    let actions = resolve_feed(&ctx.db, own).await?;

    Ok(Json(UserDetail {
        user,
        followers,
        following,
        followed_by_viewer,
        actions,
    }))
}

/// `action == "follow"` follows; any other action unfollows
async fn user_follow(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<ToggleRequest>,
) -> BookmarksResult<Json<StatusResponse>> {
    let (Some(user_id), Some(action)) = (req.id, req.action) else {
        return Ok(Json(StatusResponse::error()));
    };

    let target = match ctx.account_manager.get_user(user_id).await? {
        Some(user) if user.is_active => user,
        _ => return Ok(Json(StatusResponse::error())),
    };

    if action == "follow" {
        ctx.follow_graph.follow(auth.user_id, target.id).await?;
        ctx.action_log
            .record_action(auth.user_id, verbs::FOLLOWS, Some(ActionTarget::User(target.id)))
            .await?;
    } else {
        ctx.follow_graph.unfollow(auth.user_id, target.id).await?;
    }

    Ok(Json(StatusResponse::ok()))
}
