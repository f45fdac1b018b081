/// Configuration management for the bookmarks service
use crate::error::{BookmarksError, BookmarksResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Longest accepted action dedup window (30 days)
pub const MAX_DEDUP_WINDOW_SECS: i64 = 30 * 24 * 60 * 60;

/// Longest accepted access token lifetime (one year)
pub const MAX_TOKEN_TTL_HOURS: i64 = 365 * 24;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub counter_store: CounterStoreConfig,
    pub authentication: AuthConfig,
    pub activity: ActivityConfig,
    pub ranking: RankingConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// View counter backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterStoreConfig {
    pub backend: CounterBackendConfig,
    /// Prefix applied to every counter and ranking key
    pub key_prefix: String,
}

/// Counter store backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CounterBackendConfig {
    Redis { url: String },
    /// In-process maps; counters are lost on restart
    Memory,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

/// Activity stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Identical actions inside this trailing window are suppressed
    pub dedup_window_secs: i64,
    /// Number of actions shown on the dashboard
    pub feed_limit: i64,
}

/// Ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Number of images returned by the ranking endpoint
    pub size: usize,
    pub reconcile_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> BookmarksResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("BOOKMARKS_HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("BOOKMARKS_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| BookmarksError::Validation("Invalid port number".to_string()))?;

        let data_directory: PathBuf = env::var("BOOKMARKS_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("BOOKMARKS_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("bookmarks.sqlite"));

        let backend = match env::var("BOOKMARKS_REDIS_URL") {
            Ok(url) if !url.trim().is_empty() => CounterBackendConfig::Redis { url },
            _ => CounterBackendConfig::Memory,
        };
        let key_prefix =
            env::var("BOOKMARKS_COUNTER_KEY_PREFIX").unwrap_or_else(|_| "bookmarks:".to_string());

        let jwt_secret = env::var("BOOKMARKS_JWT_SECRET")
            .map_err(|_| BookmarksError::Validation("JWT secret required".to_string()))?;
        let token_ttl_hours = env::var("BOOKMARKS_TOKEN_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        let dedup_window_secs = env::var("BOOKMARKS_ACTION_DEDUP_WINDOW_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);
        let feed_limit = env::var("BOOKMARKS_FEED_LIMIT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let ranking_size = env::var("BOOKMARKS_RANKING_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let reconcile_interval_secs = env::var("BOOKMARKS_RANKING_RECONCILE_INTERVAL_SECS")
            .unwrap_or_else(|_| "600".to_string())
            .parse()
            .unwrap_or(600);

        let log_level =
            env::var("RUST_LOG").unwrap_or_else(|_| "bookmarks=debug,tower_http=debug".to_string());
        let log_format = env::var("BOOKMARKS_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

        Ok(ServerConfig {
            service: ServiceConfig { hostname, port },
            storage: StorageConfig {
                data_directory,
                database,
            },
            counter_store: CounterStoreConfig {
                backend,
                key_prefix,
            },
            authentication: AuthConfig {
                jwt_secret,
                token_ttl_hours,
            },
            activity: ActivityConfig {
                dedup_window_secs,
                feed_limit,
            },
            ranking: RankingConfig {
                size: ranking_size,
                reconcile_interval_secs,
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> BookmarksResult<()> {
        if self.service.hostname.is_empty() {
            return Err(BookmarksError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(BookmarksError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.token_ttl_hours <= 0
            || self.authentication.token_ttl_hours > MAX_TOKEN_TTL_HOURS
        {
            return Err(BookmarksError::Validation(format!(
                "Token TTL must be between 1 and {} hours",
                MAX_TOKEN_TTL_HOURS
            )));
        }

        if self.activity.dedup_window_secs <= 0 {
            return Err(BookmarksError::Validation(
                "Action dedup window must be positive".to_string(),
            ));
        }

        if self.activity.dedup_window_secs > MAX_DEDUP_WINDOW_SECS {
            return Err(BookmarksError::Validation(format!(
                "Action dedup window must be at most {} seconds",
                MAX_DEDUP_WINDOW_SECS
            )));
        }

        if self.ranking.size == 0 {
            return Err(BookmarksError::Validation(
                "Ranking size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Configuration used by tests: in-memory counters, fixed secret
    #[cfg(test)]
    pub fn for_tests() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 0,
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                database: PathBuf::from(":memory:"),
            },
            counter_store: CounterStoreConfig {
                backend: CounterBackendConfig::Memory,
                key_prefix: "test:".to_string(),
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-that-is-at-least-32-characters".to_string(),
                token_ttl_hours: 1,
            },
            activity: ActivityConfig {
                dedup_window_secs: 60,
                feed_limit: 10,
            },
            ranking: RankingConfig {
                size: 10,
                reconcile_interval_secs: 600,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = ServerConfig::for_tests();
        config.authentication.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut config = ServerConfig::for_tests();
        config.activity.dedup_window_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::for_tests();
        config.ranking.size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_window() {
        let mut config = ServerConfig::for_tests();
        config.activity.dedup_window_secs = MAX_DEDUP_WINDOW_SECS;
        assert!(config.validate().is_ok());

        config.activity.dedup_window_secs = MAX_DEDUP_WINDOW_SECS + 1;
        assert!(config.validate().is_err());

        config.activity.dedup_window_secs = i64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_token_ttl() {
        let mut config = ServerConfig::for_tests();
        config.authentication.token_ttl_hours = 0;
        assert!(config.validate().is_err());

        config.authentication.token_ttl_hours = MAX_TOKEN_TTL_HOURS + 1;
        assert!(config.validate().is_err());

        config.authentication.token_ttl_hours = MAX_TOKEN_TTL_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(ServerConfig::for_tests().validate().is_ok());
    }
}
