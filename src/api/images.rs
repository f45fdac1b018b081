/// Image bookmarking, detail, like and ranking endpoints
use crate::{
    actions::{verbs, ActionTarget},
    api::{StatusResponse, ToggleRequest},
    auth::AuthContext,
    context::AppContext,
    error::BookmarksResult,
    images::{CreateImageRequest, Image},
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

const DEFAULT_LIST_LIMIT: i64 = 20;
const MAX_LIST_LIMIT: i64 = 100;

/// Build image routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/images/", get(list_images))
        .route("/images/create", post(create_image))
        .route("/images/detail/:id/:slug", get(image_detail))
        .route("/images/like", post(image_like))
        .route("/images/ranking", get(image_ranking))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

/// Image detail with its view total and likers
#[derive(Debug, Serialize)]
pub struct ImageDetail {
    #[serde(flatten)]
    pub image: Image,
    /// `None` when the counter store could not be reached
    pub total_views: Option<i64>,
    pub liked_by: Vec<i64>,
}

async fn create_image(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<CreateImageRequest>,
) -> BookmarksResult<(StatusCode, [(header::HeaderName, String); 1], Json<Image>)> {
    let image = ctx.images.create(auth.user_id, &req).await?;

    ctx.action_log
        .record_action(auth.user_id, verbs::BOOKMARKED_IMAGE, Some(ActionTarget::Image(image.id)))
        .await?;

    let location = image.absolute_url();
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(image)))
}

async fn list_images(
    State(ctx): State<AppContext>,
    Query(params): Query<ListParams>,
) -> BookmarksResult<Json<Vec<Image>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    Ok(Json(ctx.images.list(limit).await?))
}

/// Renders even when view tracking fails
async fn image_detail(
    State(ctx): State<AppContext>,
    Path((id, slug)): Path<(i64, String)>,
) -> BookmarksResult<Json<ImageDetail>> {
    let image = ctx.images.get_by_id_and_slug(id, &slug).await?;

    let total_views = match ctx.ranking.record_view(image.id).await {
        Ok(views) => Some(views),
        Err(e) => {
            tracing::warn!(image_id = image.id, error = %e, "Failed to record image view");
            None
        }
    };

    let liked_by = ctx.likes.liked_by(image.id).await?;

    Ok(Json(ImageDetail {
        image,
        total_views,
        liked_by,
    }))
}

/// `action == "like"` likes; any other action unlikes
async fn image_like(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<ToggleRequest>,
) -> BookmarksResult<Json<StatusResponse>> {
    let (Some(image_id), Some(action)) = (req.id, req.action) else {
        return Ok(Json(StatusResponse::error()));
    };

    if ctx.images.get(image_id).await?.is_none() {
        return Ok(Json(StatusResponse::error()));
    }

    if action == "like" {
        ctx.likes.like(image_id, auth.user_id).await?;
        ctx.action_log
            .record_action(auth.user_id, verbs::LIKES, Some(ActionTarget::Image(image_id)))
            .await?;
    } else {
        ctx.likes.unlike(image_id, auth.user_id).await?;
    }

    Ok(Json(StatusResponse::ok()))
}

async fn image_ranking(State(ctx): State<AppContext>) -> BookmarksResult<Json<Vec<Image>>> {
    let ranked = ctx.ranking.top_ranked(ctx.config.ranking.size).await?;
    Ok(Json(ranked))
}
