//! Database connection pool
//!
//! Repositories receive a `DynDatabasePool` instead of a concrete sqlx pool,
//! so tests can hand them an in-memory database with the same schema.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::DatabaseConfig;

/// Database pool trait shared by every repository.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run a statement that returns no rows; yields the affected row count
    async fn execute(&self, query: &str) -> Result<u64>;

    async fn ping(&self) -> Result<()>;

    /// Underlying SQLite pool, for typed sqlx queries
    fn sqlite(&self) -> &SqlitePool;
}

pub struct SqliteDatabase {
    pool: SqlitePool,
}

/// Where the database lives, derived from `database.url`
#[derive(Debug, PartialEq, Eq)]
enum Location<'a> {
    Memory,
    Url(&'a str),
    File(&'a Path),
}

impl<'a> Location<'a> {
    fn parse(url: &'a str) -> Self {
        if url == ":memory:" || url.starts_with("sqlite::memory:") {
            Location::Memory
        } else if url.starts_with("sqlite:") {
            Location::Url(url)
        } else {
            Location::File(Path::new(url))
        }
    }
}

impl SqliteDatabase {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let location = Location::parse(&config.url);
        let busy_timeout = Duration::from_secs(config.busy_timeout_secs);

        let (options, pool_options) = match location {
            // Each `:memory:` connection is a separate database, so the pool
            // is pinned to a single connection that never expires.
            Location::Memory => (
                SqliteConnectOptions::from_str("sqlite::memory:")?,
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None),
            ),
            Location::Url(url) => (
                SqliteConnectOptions::from_str(url)
                    .with_context(|| format!("Invalid database url: {}", url))?
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal),
                SqlitePoolOptions::new().max_connections(config.max_connections.max(1)),
            ),
            Location::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
                }
                (
                    SqliteConnectOptions::new()
                        .filename(path)
                        .create_if_missing(true)
                        .journal_mode(SqliteJournalMode::Wal),
                    SqlitePoolOptions::new().max_connections(config.max_connections.max(1)),
                )
            }
        };

        let options = options.foreign_keys(true).busy_timeout(busy_timeout);
        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database: {}", config.url))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    fn sqlite(&self) -> &SqlitePool {
        &self.pool
    }
}

pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Open the configured database.
///
/// # Errors
///
/// Returns an error if the url is malformed or the database cannot be opened.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    let db = SqliteDatabase::connect(config).await?;
    Ok(Arc::new(db))
}

/// In-memory database for tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    let config = DatabaseConfig {
        url: ":memory:".to_string(),
        ..DatabaseConfig::default()
    };
    create_pool(&config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_parse() {
        assert_eq!(Location::parse(":memory:"), Location::Memory);
        assert_eq!(Location::parse("sqlite::memory:"), Location::Memory);
        assert_eq!(Location::parse("sqlite://data/app.db"), Location::Url("sqlite://data/app.db"));
        assert_eq!(Location::parse("data/app.db"), Location::File(Path::new("data/app.db")));
    }

    #[tokio::test]
    async fn test_memory_pool_keeps_state_between_queries() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        pool.ping().await.expect("Ping should succeed");

        pool.execute("CREATE TABLE slots (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .expect("Failed to create table");
        let affected = pool
            .execute("INSERT INTO slots (name) VALUES ('cover')")
            .await
            .expect("Failed to insert");
        assert_eq!(affected, 1);

        let affected = pool
            .execute("UPDATE slots SET name = 'banner'")
            .await
            .expect("Table should still exist");
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_file_database_creates_parent_directories() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("media").join("library.db");

        let config = DatabaseConfig {
            url: db_path.to_string_lossy().to_string(),
            ..DatabaseConfig::default()
        };
        let pool = create_pool(&config).await.expect("Failed to create pool");
        pool.ping().await.expect("Ping should succeed");

        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        let row: (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(pool.sqlite())
            .await
            .expect("Failed to read pragma");
        assert_eq!(row.0, 1);
    }
}
