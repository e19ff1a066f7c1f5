//! Page repository

use crate::db::DynDatabasePool;
use crate::models::{Page, PageStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait PageRepository: Send + Sync {
    /// Insert a page, returning it with its new ID
    async fn create(&self, page: &Page) -> Result<Page>;
    /// Get a page by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Page>>;
    /// Get a page by slug, whatever its status
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Page>>;
    /// All pages including drafts, ordered by title
    async fn list(&self) -> Result<Vec<Page>>;
    /// Published pages only, ordered by title
    async fn list_published(&self) -> Result<Vec<Page>>;
    /// Update slug, title and status
    async fn update(&self, page: &Page) -> Result<Page>;
    /// Delete a page; its sections cascade
    async fn delete(&self, id: i64) -> Result<bool>;
    /// Check if a slug is taken
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;
}

/// SQLx-based page repository implementation
pub struct SqlxPageRepository {
    pool: DynDatabasePool,
}

impl SqlxPageRepository {
    /// Create a new SQLx page repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PageRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PageRepository for SqlxPageRepository {
    async fn create(&self, page: &Page) -> Result<Page> {
        create_sqlite(self.pool.sqlite(), page).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Page>> {
        let row = sqlx::query("SELECT * FROM pages WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get page by ID")?;
        row.map(|r| row_to_page_sqlite(&r)).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Page>> {
        let row = sqlx::query("SELECT * FROM pages WHERE slug = ?")
            .bind(slug)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get page by slug")?;
        row.map(|r| row_to_page_sqlite(&r)).transpose()
    }

    async fn list(&self) -> Result<Vec<Page>> {
        list_sqlite(self.pool.sqlite(), None).await
    }

    async fn list_published(&self) -> Result<Vec<Page>> {
        list_sqlite(self.pool.sqlite(), Some(PageStatus::Published)).await
    }

    async fn update(&self, page: &Page) -> Result<Page> {
        update_sqlite(self.pool.sqlite(), page).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pages WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete page")?;
        Ok(result.rows_affected() > 0)
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pages WHERE slug = ?")
            .bind(slug)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to check page slug")?;
        Ok(count > 0)
    }
}

async fn create_sqlite(pool: &SqlitePool, page: &Page) -> Result<Page> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO pages (slug, title, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&page.slug)
    .bind(&page.title)
    .bind(page.status.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create page")?;

    Ok(Page {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..page.clone()
    })
}

async fn list_sqlite(pool: &SqlitePool, status: Option<PageStatus>) -> Result<Vec<Page>> {
    let rows = match status {
        Some(status) => {
            sqlx::query("SELECT * FROM pages WHERE status = ? ORDER BY title")
                .bind(status.to_string())
                .fetch_all(pool)
                .await
        }
        None => sqlx::query("SELECT * FROM pages ORDER BY title").fetch_all(pool).await,
    }
    .context("Failed to list pages")?;

    rows.iter().map(row_to_page_sqlite).collect()
}

async fn update_sqlite(pool: &SqlitePool, page: &Page) -> Result<Page> {
    let now = Utc::now();
    sqlx::query("UPDATE pages SET slug = ?, title = ?, status = ?, updated_at = ? WHERE id = ?")
        .bind(&page.slug)
        .bind(&page.title)
        .bind(page.status.to_string())
        .bind(now)
        .bind(page.id)
        .execute(pool)
        .await
        .context("Failed to update page")?;

    Ok(Page {
        updated_at: now,
        ..page.clone()
    })
}

fn row_to_page_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Page> {
    let status: String = row.get("status");
    Ok(Page {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        status: PageStatus::from_str(&status)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_repo() -> SqlxPageRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxPageRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let repo = setup_repo().await;
        let page = repo
            .create(&Page::new("about".to_string(), "About".to_string(), PageStatus::Draft))
            .await
            .unwrap();

        assert!(repo.exists_by_slug("about").await.unwrap());
        assert_eq!(repo.get_by_slug("about").await.unwrap().unwrap().id, page.id);
        assert!(repo.list_published().await.unwrap().is_empty());

        let mut published = page.clone();
        published.status = PageStatus::Published;
        repo.update(&published).await.unwrap();
        assert_eq!(repo.list_published().await.unwrap().len(), 1);

        assert!(repo.delete(page.id).await.unwrap());
        assert!(repo.get_by_id(page.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slug_is_unique() {
        let repo = setup_repo().await;
        let page = Page::new("home".to_string(), "Home".to_string(), PageStatus::Published);
        repo.create(&page).await.unwrap();
        assert!(repo.create(&page).await.is_err());
    }
}
