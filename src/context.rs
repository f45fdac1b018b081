/// Application context and dependency injection
use crate::{
    account::AccountManager,
    actions::ActionLog,
    config::ServerConfig,
    counter::{self, CounterKeys, CounterStore},
    db,
    error::{BookmarksError, BookmarksResult},
    follow::FollowGraph,
    images::{ImageStore, LikeManager},
    ranking::ViewRanking,
};
use chrono::Duration;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub action_log: Arc<ActionLog>,
    pub follow_graph: Arc<FollowGraph>,
    pub images: Arc<ImageStore>,
    pub likes: Arc<LikeManager>,
    // View counters and ranking
    pub counter_store: Arc<dyn CounterStore>,
    pub ranking: Arc<ViewRanking>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> BookmarksResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let counter_store = counter::connect(&config.counter_store).await?;

        Ok(Self::from_parts(config, db, counter_store))
    }

    /// Wire services over an already-migrated pool and a connected counter store
    pub fn from_parts(
        config: ServerConfig,
        db: SqlitePool,
        counter_store: Arc<dyn CounterStore>,
    ) -> Self {
        let account_manager = Arc::new(AccountManager::new(
            db.clone(),
            config.authentication.jwt_secret.clone(),
            Duration::hours(config.authentication.token_ttl_hours),
        ));
        let action_log = Arc::new(ActionLog::new(
            db.clone(),
            Duration::seconds(config.activity.dedup_window_secs),
        ));
        let follow_graph = Arc::new(FollowGraph::new(db.clone()));
        let images = ImageStore::new(db.clone());
        let likes = Arc::new(LikeManager::new(db.clone()));
        let ranking = Arc::new(ViewRanking::new(
            counter_store.clone(),
            images.clone(),
            CounterKeys::new(config.counter_store.key_prefix.clone()),
        ));

        Self {
            config: Arc::new(config),
            db,
            account_manager,
            action_log,
            follow_graph,
            images: Arc::new(images),
            likes,
            counter_store,
            ranking,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> BookmarksResult<()> {
        let mut dirs = vec![config.storage.data_directory.clone()];
        if let Some(parent) = config.storage.database.parent() {
            dirs.push(parent.to_path_buf());
        }

        for dir in dirs {
            if dir.as_os_str().is_empty() || dir.exists() {
                continue;
            }
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                BookmarksError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }

    /// Context over an in-memory database and in-process counters
    #[cfg(test)]
    pub async fn for_tests() -> Self {
        Self::from_parts(
            ServerConfig::for_tests(),
            db::test_pool().await,
            Arc::new(counter::MemoryCounterStore::new()),
        )
    }
}
