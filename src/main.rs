/// Bookmarks - social image bookmarking service
///
/// Users bookmark images from external URLs, follow each other, like images,
/// and browse an activity feed and a most-viewed ranking.

mod account;
mod actions;
mod api;
mod auth;
mod config;
mod context;
mod counter;
mod db;
mod error;
mod follow;
mod images;
mod jobs;
mod metrics;
mod ranking;
mod server;
mod validation;

use config::{LoggingConfig, ServerConfig};
use context::AppContext;
use error::BookmarksResult;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> BookmarksResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    init_tracing(&config.logging);

    print_banner();

    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_new(&logging.level)
        .unwrap_or_else(|_| "bookmarks=info,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_banner() {
    println!(
        r#"
    __                __                        __
   / /_  ____  ____  / /______ ___  ____ ______/ /_______
  / __ \/ __ \/ __ \/ //_/ __ `__ \/ __ `/ ___/ //_/ ___/
 / /_/ / /_/ / /_/ / ,< / / / / / / /_/ / /  / ,< (__  )
/_.___/\____/\____/_/|_/_/ /_/ /_/\__,_/_/  /_/|_/____/

        Social image bookmarking v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
