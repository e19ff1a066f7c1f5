//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentStatus, CommentWithAuthor};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment, approved or pending
    async fn create(&self, author_id: i64, media_id: Option<i64>, content: &str, approved: bool) -> Result<Comment>;

    /// Get a comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Approved comments on a media item (`None`: site-wide comments), oldest first
    async fn list_approved(&self, media_id: Option<i64>) -> Result<Vec<CommentWithAuthor>>;

    /// Comments for moderation, newest first. `None` lists every status.
    async fn list_by_status(
        &self,
        status: Option<CommentStatus>,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<CommentWithAuthor>, i64)>;

    /// Move a comment to `status`, returning false if it does not exist
    async fn set_status(&self, id: i64, status: CommentStatus) -> Result<bool>;

    /// Delete a comment; `false` when it did not exist
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based comment repository
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, author_id: i64, media_id: Option<i64>, content: &str, approved: bool) -> Result<Comment> {
        create_sqlite(self.pool.sqlite(), author_id, media_id, content, approved).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        get_by_id_sqlite(self.pool.sqlite(), id).await
    }

    async fn list_approved(&self, media_id: Option<i64>) -> Result<Vec<CommentWithAuthor>> {
        list_approved_sqlite(self.pool.sqlite(), media_id).await
    }

    async fn list_by_status(
        &self,
        status: Option<CommentStatus>,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<CommentWithAuthor>, i64)> {
        list_by_status_sqlite(self.pool.sqlite(), status, page, per_page).await
    }

    async fn set_status(&self, id: i64, status: CommentStatus) -> Result<bool> {
        set_status_sqlite(self.pool.sqlite(), id, status).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete comment")?;
        Ok(result.rows_affected() > 0)
    }
}

const WITH_AUTHOR_SELECT: &str = r#"
    SELECT c.*, u.username AS author_username, u.email AS author_email, p.avatar_url AS author_avatar
    FROM comments c
    JOIN users u ON c.author_id = u.id
    LEFT JOIN profiles p ON p.user_id = u.id
"#;

fn status_clause(status: CommentStatus) -> &'static str {
    match status {
        CommentStatus::Pending => "c.is_approved = 0 AND c.is_flagged = 0",
        CommentStatus::Approved => "c.is_approved = 1 AND c.is_flagged = 0",
        CommentStatus::Flagged => "c.is_flagged = 1",
    }
}

async fn create_sqlite(
    pool: &SqlitePool,
    author_id: i64,
    media_id: Option<i64>,
    content: &str,
    approved: bool,
) -> Result<Comment> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO comments (author_id, media_id, content, is_approved, is_flagged, created_at, updated_at)
        VALUES (?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(author_id)
    .bind(media_id)
    .bind(content)
    .bind(approved)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        author_id,
        media_id,
        content: content.to_string(),
        is_approved: approved,
        is_flagged: false,
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query("SELECT * FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    Ok(row.map(|r| row_to_comment(&r)))
}

async fn list_approved_sqlite(pool: &SqlitePool, media_id: Option<i64>) -> Result<Vec<CommentWithAuthor>> {
    // `IS` matches NULL as well, so one query serves site-wide comments too
    let sql = format!(
        "{} WHERE c.media_id IS ? AND {} ORDER BY c.created_at ASC, c.id ASC",
        WITH_AUTHOR_SELECT,
        status_clause(CommentStatus::Approved)
    );
    let rows = sqlx::query(&sql)
        .bind(media_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    Ok(rows.iter().map(row_to_comment_with_author).collect())
}

async fn list_by_status_sqlite(
    pool: &SqlitePool,
    status: Option<CommentStatus>,
    page: i64,
    per_page: i64,
) -> Result<(Vec<CommentWithAuthor>, i64)> {
    let offset = (page.max(1) - 1) * per_page;
    let where_clause = status
        .map(|s| format!("WHERE {}", status_clause(s)))
        .unwrap_or_default();

    let count_sql = format!("SELECT COUNT(*) FROM comments c {}", where_clause);
    let total: i64 = sqlx::query_scalar(&count_sql)
        .fetch_one(pool)
        .await
        .context("Failed to count comments")?;

    let sql = format!(
        "{} {} ORDER BY c.created_at DESC, c.id DESC LIMIT ? OFFSET ?",
        WITH_AUTHOR_SELECT, where_clause
    );
    let rows = sqlx::query(&sql)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list comments for moderation")?;

    Ok((rows.iter().map(row_to_comment_with_author).collect(), total))
}

async fn set_status_sqlite(pool: &SqlitePool, id: i64, status: CommentStatus) -> Result<bool> {
    let (approved, flagged) = match status {
        CommentStatus::Pending => (false, false),
        CommentStatus::Approved => (true, false),
        CommentStatus::Flagged => (false, true),
    };
    let result = sqlx::query("UPDATE comments SET is_approved = ?, is_flagged = ?, updated_at = ? WHERE id = ?")
        .bind(approved)
        .bind(flagged)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update comment status")?;
    Ok(result.rows_affected() > 0)
}

fn row_to_comment(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        author_id: row.get("author_id"),
        media_id: row.get("media_id"),
        content: row.get("content"),
        is_approved: row.get("is_approved"),
        is_flagged: row.get("is_flagged"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_comment_with_author(row: &SqliteRow) -> CommentWithAuthor {
    let email: String = row.get("author_email");
    CommentWithAuthor::new(
        row_to_comment(row),
        row.get("author_username"),
        &email,
        row.get("author_avatar"),
    )
}
