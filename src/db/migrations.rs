//! Database migrations
//!
//! Migrations are embedded in the binary as SQL strings and applied in
//! version order. Applied versions are recorded in the `_migrations` table,
//! so running the migrator twice is a no-op.
//!
//! ```ignore
//! use vitrine::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::DynDatabasePool;

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements, separated by `;`
    pub up: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'visitor',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        "#,
    },
    Migration {
        version: 2,
        name: "create_sessions",
        up: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_profiles",
        up: r#"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id INTEGER PRIMARY KEY,
                display_name VARCHAR(100),
                bio TEXT,
                location VARCHAR(100),
                website VARCHAR(500),
                avatar_url VARCHAR(1000),
                banner_url VARCHAR(1000),
                -- JSON array of six nullable URLs
                media_slots TEXT NOT NULL DEFAULT '[null,null,null,null,null,null]',
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 4,
        name: "create_media_items",
        up: r#"
            CREATE TABLE IF NOT EXISTS media_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                kind VARCHAR(10) NOT NULL DEFAULT 'image',
                cover_image VARCHAR(1000) NOT NULL,
                image_urls TEXT NOT NULL DEFAULT '[]',
                video_url VARCHAR(1000),
                tags TEXT NOT NULL DEFAULT '[]',
                premium BOOLEAN NOT NULL DEFAULT FALSE,
                gallery_class VARCHAR(100),
                created_by INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (created_by) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_media_items_kind ON media_items(kind);
            CREATE INDEX IF NOT EXISTS idx_media_items_gallery_class ON media_items(gallery_class);
            CREATE INDEX IF NOT EXISTS idx_media_items_created_at ON media_items(created_at);
        "#,
    },
    Migration {
        version: 5,
        name: "create_galleries",
        up: r#"
            CREATE TABLE IF NOT EXISTS gallery_sets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                classification VARCHAR(100),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS gallery_items (
                gallery_id INTEGER NOT NULL,
                media_id INTEGER NOT NULL,
                position INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (gallery_id, media_id),
                FOREIGN KEY (gallery_id) REFERENCES gallery_sets(id) ON DELETE CASCADE,
                FOREIGN KEY (media_id) REFERENCES media_items(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_gallery_items_media_id ON gallery_items(media_id);
        "#,
    },
    Migration {
        version: 6,
        name: "create_comments",
        up: r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id INTEGER NOT NULL,
                media_id INTEGER,
                content TEXT NOT NULL,
                is_approved BOOLEAN NOT NULL DEFAULT FALSE,
                is_flagged BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (media_id) REFERENCES media_items(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_comments_media_id ON comments(media_id);
            CREATE INDEX IF NOT EXISTS idx_comments_author_id ON comments(author_id);
        "#,
    },
    Migration {
        version: 7,
        name: "create_pages",
        up: r#"
            CREATE TABLE IF NOT EXISTS pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug VARCHAR(200) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_pages_slug ON pages(slug);
        "#,
    },
    Migration {
        version: 8,
        name: "create_page_sections",
        up: r#"
            CREATE TABLE IF NOT EXISTS page_sections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_id INTEGER NOT NULL,
                kind VARCHAR(20) NOT NULL DEFAULT 'text',
                position INTEGER NOT NULL DEFAULT 0,
                heading VARCHAR(255),
                body TEXT NOT NULL DEFAULT '',
                body_html TEXT NOT NULL DEFAULT '',
                image_urls TEXT NOT NULL DEFAULT '[]',
                gallery_id INTEGER,
                visible BOOLEAN NOT NULL DEFAULT TRUE,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (page_id) REFERENCES pages(id) ON DELETE CASCADE,
                FOREIGN KEY (gallery_id) REFERENCES gallery_sets(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_page_sections_page_id ON page_sections(page_id, position);
        "#,
    },
];

/// Run all pending migrations, returning how many were applied.
///
/// # Errors
///
/// Returns an error if any migration fails to apply
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool.sqlite()).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool.sqlite(), migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    pool.execute(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name VARCHAR(255) NOT NULL UNIQUE,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .await?;
    Ok(())
}

async fn get_applied_migrations(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    let records = rows
        .into_iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect();

    Ok(records)
}

async fn apply_migration(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    Ok(pending_count(pool).await? == 0)
}

/// Get pending migrations count
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool.sqlite()).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

/// Get the total number of migrations defined
pub fn total_migrations() -> usize {
    MIGRATIONS.len()
}

/// Get migration by version
pub fn get_migration(version: i32) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.version == version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    async fn insert_user(pool: &SqlitePool, username: &str) -> i64 {
        sqlx::query("INSERT INTO users (username, email, password_hash, role) VALUES (?, ?, ?, ?)")
            .bind(username)
            .bind(format!("{}@example.com", username))
            .bind("hash123")
            .bind("member")
            .execute(pool)
            .await
            .expect("Failed to create user")
            .last_insert_rowid()
    }

    async fn insert_media(pool: &SqlitePool, title: &str) -> i64 {
        sqlx::query("INSERT INTO media_items (title, cover_image) VALUES (?, ?)")
            .bind(title)
            .bind("https://res.cloudinary.com/demo/image/upload/v1/sample.jpg")
            .execute(pool)
            .await
            .expect("Failed to create media item")
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_is_up_to_date_and_pending_count() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        assert!(!is_up_to_date(&pool).await.unwrap());
        assert_eq!(pending_count(&pool).await.unwrap(), MIGRATIONS.len());

        run_migrations(&pool).await.expect("Failed to run migrations");

        assert!(is_up_to_date(&pool).await.unwrap());
        assert_eq!(pending_count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_default_role_is_visitor() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite();

        sqlx::query("INSERT INTO users (username, email, password_hash) VALUES ('a', 'a@example.com', 'h')")
            .execute(sqlite)
            .await
            .unwrap();
        let row = sqlx::query("SELECT role FROM users WHERE username = 'a'")
            .fetch_one(sqlite)
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("role"), "visitor");
    }

    #[tokio::test]
    async fn test_session_requires_user() {
        let pool = migrated_pool().await;

        let result = sqlx::query(
            "INSERT INTO sessions (id, user_id, expires_at) VALUES (?, ?, datetime('now', '+1 day'))",
        )
        .bind("session123")
        .bind(999i64)
        .execute(pool.sqlite())
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_deleting_media_cascades_to_galleries_and_comments() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite();

        let user_id = insert_user(sqlite, "author").await;
        let media_id = insert_media(sqlite, "Sunset").await;
        let gallery_id = sqlx::query("INSERT INTO gallery_sets (title) VALUES ('Travel')")
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();

        sqlx::query("INSERT INTO gallery_items (gallery_id, media_id, position) VALUES (?, ?, 0)")
            .bind(gallery_id)
            .bind(media_id)
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query("INSERT INTO comments (author_id, media_id, content) VALUES (?, ?, 'nice')")
            .bind(user_id)
            .bind(media_id)
            .execute(sqlite)
            .await
            .unwrap();

        sqlx::query("DELETE FROM media_items WHERE id = ?")
            .bind(media_id)
            .execute(sqlite)
            .await
            .unwrap();

        let row = sqlx::query("SELECT (SELECT COUNT(*) FROM gallery_items) AS g, (SELECT COUNT(*) FROM comments) AS c")
            .fetch_one(sqlite)
            .await
            .unwrap();
        assert_eq!(row.get::<i64, _>("g"), 0);
        assert_eq!(row.get::<i64, _>("c"), 0);
    }

    #[tokio::test]
    async fn test_deleting_gallery_keeps_media() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite();

        let media_id = insert_media(sqlite, "Harbour").await;
        let gallery_id = sqlx::query("INSERT INTO gallery_sets (title) VALUES ('Coast')")
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();
        sqlx::query("INSERT INTO gallery_items (gallery_id, media_id) VALUES (?, ?)")
            .bind(gallery_id)
            .bind(media_id)
            .execute(sqlite)
            .await
            .unwrap();

        sqlx::query("DELETE FROM gallery_sets WHERE id = ?")
            .bind(gallery_id)
            .execute(sqlite)
            .await
            .unwrap();

        let row = sqlx::query("SELECT COUNT(*) AS count FROM media_items")
            .fetch_one(sqlite)
            .await
            .unwrap();
        assert_eq!(row.get::<i64, _>("count"), 1);
    }

    #[tokio::test]
    async fn test_page_slug_unique() {
        let pool = migrated_pool().await;
        let sqlite = pool.sqlite();

        sqlx::query("INSERT INTO pages (slug, title) VALUES ('home', 'Home')")
            .execute(sqlite)
            .await
            .unwrap();
        let result = sqlx::query("INSERT INTO pages (slug, title) VALUES ('home', 'Other')")
            .execute(sqlite)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_get_migration() {
        assert_eq!(get_migration(1).map(|m| m.name), Some("create_users"));
        assert!(get_migration(999).is_none());
        assert_eq!(total_migrations(), 8);
    }

    #[test]
    fn test_split_sql_statements() {
        let statements = split_sql_statements("CREATE TABLE a (id INT); CREATE TABLE b (id INT);");
        assert_eq!(statements.len(), 2);

        let statements = split_sql_statements("-- Comment\nCREATE TABLE a (id INT);\n-- trailing");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- This is a comment"));
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("CREATE TABLE test"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }

    #[test]
    fn test_truncate_sql() {
        let long = "x".repeat(150);
        assert_eq!(truncate_sql(&long).len(), 103);
        assert_eq!(truncate_sql("SELECT 1"), "SELECT 1");
    }
}
