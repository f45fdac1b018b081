/// Database layer for the bookmarks service
///
/// Manages the SQLite connection pool, embedded migrations, and the
/// timestamp encoding shared by every table.

use crate::error::{BookmarksError, BookmarksResult};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::SqlitePool;
use std::path::Path;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> BookmarksResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    sqlx::sqlite::SqliteJournalMode::Wal
                } else {
                    sqlx::sqlite::SqliteJournalMode::Delete
                })
                .foreign_keys(true)
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await?;

    Ok(pool)
}

/// Run migrations for a database
/// Migrations are embedded at compile time from ./migrations directory
pub async fn run_migrations(pool: &SqlitePool) -> BookmarksResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| BookmarksError::Internal(format!("Migration failed: {}", e)))?;

    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> BookmarksResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Encode a timestamp for storage.
///
/// Fixed-width RFC3339 with microseconds and a `Z` suffix, so that SQL string
/// comparison orders the same way as the timestamps themselves.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored RFC3339 timestamp
pub fn parse_timestamp(s: &str) -> BookmarksResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BookmarksError::Internal(format!("Invalid timestamp: {}", e)))
}

/// Parse a stored calendar date (YYYY-MM-DD)
pub fn parse_date(s: &str) -> BookmarksResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| BookmarksError::Internal(format!("Invalid date: {}", e)))
}

/// Single-connection in-memory pool with the schema applied
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    use std::str::FromStr;

    let options = sqlx::sqlite::SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    // One connection that never recycles; the database lives only as long as it does
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();

    run_migrations(&pool).await.unwrap();
    pool
}

/// Insert a bare active user row, returning its id
#[cfg(test)]
pub async fn insert_test_user(pool: &SqlitePool, username: &str) -> i64 {
    sqlx::query(
        "INSERT INTO users (username, email, password_hash, is_active, date_joined)
         VALUES (?1, ?2, 'x', 1, ?3)",
    )
    .bind(username)
    .bind(format!("{}@example.com", username))
    .bind(format_timestamp(Utc::now()))
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

/// Insert an image row owned by `user_id`, returning its id
#[cfg(test)]
pub async fn insert_test_image(pool: &SqlitePool, user_id: i64, title: &str) -> i64 {
    sqlx::query(
        "INSERT INTO image (user_id, title, slug, url, description, created)
         VALUES (?1, ?2, ?3, ?4, '', '2024-01-01')",
    )
    .bind(user_id)
    .bind(title)
    .bind(title.to_lowercase().replace(' ', "-"))
    .bind(format!("https://example.com/{}.jpg", title))
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_roundtrip_and_ordering() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let late = early + chrono::Duration::milliseconds(1500);

        let a = format_timestamp(early);
        let b = format_timestamp(late);

        assert_eq!(a, "2024-01-01T09:00:00.000000Z");
        assert!(a < b);
        assert_eq!(parse_timestamp(&b).unwrap(), late);
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date("1990-05-17").unwrap();
        assert_eq!(date.to_string(), "1990-05-17");
        assert!(parse_date("17/05/1990").is_err());
    }

    #[tokio::test]
    async fn test_create_pool_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bookmarks.sqlite");

        let pool = create_pool(&path, DatabaseOptions::default()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        test_connection(&pool).await.unwrap();

        assert!(path.exists());
    }
}
