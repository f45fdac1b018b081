/// Background task implementations
use crate::{context::AppContext, error::BookmarksResult};

/// Reset every ranking score to its image's view counter
pub async fn reconcile_ranking(ctx: &AppContext) -> BookmarksResult<usize> {
    let ids = ctx.images.all_ids().await?;
    ctx.ranking.reconcile(&ids).await
}

/// Recompute cached like counts from the like relation
pub async fn recount_likes(ctx: &AppContext) -> BookmarksResult<u64> {
    ctx.likes.recount_all().await
}

/// Health check - verify all systems are operational
pub async fn health_check(ctx: &AppContext) -> BookmarksResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;
    ctx.counter_store.ping().await?;
    Ok(())
}
