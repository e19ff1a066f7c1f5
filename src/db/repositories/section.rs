//! Page section repository
//!
//! Sections are ordered by `position` within their page. New sections are
//! appended after the current last one.

use crate::db::DynDatabasePool;
use crate::models::{PageSection, SectionKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait SectionRepository: Send + Sync {
    /// Append a section to its page; `position` on the input is ignored
    async fn create(&self, section: &PageSection) -> Result<PageSection>;
    /// Get a section by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<PageSection>>;
    /// Sections of a page in position order
    async fn list_by_page(&self, page_id: i64, visible_only: bool) -> Result<Vec<PageSection>>;
    /// Overwrite a section's content columns
    async fn update(&self, section: &PageSection) -> Result<PageSection>;
    /// Replace the ordered image list; `false` when the section is gone
    async fn set_images(&self, id: i64, image_urls: &[String]) -> Result<bool>;
    /// Delete a section
    async fn delete(&self, id: i64) -> Result<bool>;
    /// Rewrite positions to follow `ordered_ids`
    async fn reorder(&self, page_id: i64, ordered_ids: &[i64]) -> Result<()>;
}

/// SQLx-based page section repository implementation
pub struct SqlxSectionRepository {
    pool: DynDatabasePool,
}

impl SqlxSectionRepository {
    /// Create a new SQLx section repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SectionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SectionRepository for SqlxSectionRepository {
    async fn create(&self, section: &PageSection) -> Result<PageSection> {
        create_sqlite(self.pool.sqlite(), section).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PageSection>> {
        let row = sqlx::query("SELECT * FROM page_sections WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get section by ID")?;
        row.map(|r| row_to_section(&r)).transpose()
    }

    async fn list_by_page(&self, page_id: i64, visible_only: bool) -> Result<Vec<PageSection>> {
        let sql = if visible_only {
            "SELECT * FROM page_sections WHERE page_id = ? AND visible = 1 ORDER BY position, id"
        } else {
            "SELECT * FROM page_sections WHERE page_id = ? ORDER BY position, id"
        };
        let rows = sqlx::query(sql)
            .bind(page_id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list page sections")?;
        rows.iter().map(row_to_section).collect()
    }

    async fn update(&self, section: &PageSection) -> Result<PageSection> {
        update_sqlite(self.pool.sqlite(), section).await
    }

    async fn set_images(&self, id: i64, image_urls: &[String]) -> Result<bool> {
        let result = sqlx::query("UPDATE page_sections SET image_urls = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(image_urls)?)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to set section images")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM page_sections WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete section")?;
        Ok(result.rows_affected() > 0)
    }

    async fn reorder(&self, page_id: i64, ordered_ids: &[i64]) -> Result<()> {
        reorder_sqlite(self.pool.sqlite(), page_id, ordered_ids).await
    }
}

async fn create_sqlite(pool: &SqlitePool, section: &PageSection) -> Result<PageSection> {
    let now = Utc::now();
    let position: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(position) + 1, 0) FROM page_sections WHERE page_id = ?")
            .bind(section.page_id)
            .fetch_one(pool)
            .await
            .context("Failed to compute section position")?;

    let result = sqlx::query(
        r#"
        INSERT INTO page_sections
            (page_id, kind, position, heading, body, body_html, image_urls, gallery_id, visible, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(section.page_id)
    .bind(section.kind.to_string())
    .bind(position)
    .bind(&section.heading)
    .bind(&section.body)
    .bind(&section.body_html)
    .bind(serde_json::to_string(&section.image_urls)?)
    .bind(section.gallery_id)
    .bind(section.visible)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create section")?;

    Ok(PageSection {
        id: result.last_insert_rowid(),
        position,
        updated_at: now,
        ..section.clone()
    })
}

async fn update_sqlite(pool: &SqlitePool, section: &PageSection) -> Result<PageSection> {
    let now = Utc::now();
    sqlx::query(
        r#"
        UPDATE page_sections
        SET kind = ?, heading = ?, body = ?, body_html = ?, image_urls = ?, gallery_id = ?, visible = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(section.kind.to_string())
    .bind(&section.heading)
    .bind(&section.body)
    .bind(&section.body_html)
    .bind(serde_json::to_string(&section.image_urls)?)
    .bind(section.gallery_id)
    .bind(section.visible)
    .bind(now)
    .bind(section.id)
    .execute(pool)
    .await
    .context("Failed to update section")?;

    Ok(PageSection {
        updated_at: now,
        ..section.clone()
    })
}

async fn reorder_sqlite(pool: &SqlitePool, page_id: i64, ordered_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    for (position, id) in ordered_ids.iter().enumerate() {
        sqlx::query("UPDATE page_sections SET position = ? WHERE id = ? AND page_id = ?")
            .bind(position as i64)
            .bind(id)
            .bind(page_id)
            .execute(&mut *tx)
            .await
            .context("Failed to reorder sections")?;
    }
    tx.commit().await.context("Failed to commit section order")?;
    Ok(())
}

fn row_to_section(row: &SqliteRow) -> Result<PageSection> {
    let kind: String = row.get("kind");
    let image_urls: String = row.get("image_urls");
    Ok(PageSection {
        id: row.get("id"),
        page_id: row.get("page_id"),
        kind: SectionKind::from_str(&kind)?,
        position: row.get("position"),
        heading: row.get("heading"),
        body: row.get("body"),
        body_html: row.get("body_html"),
        image_urls: serde_json::from_str(&image_urls).context("Corrupt section image list")?,
        gallery_id: row.get("gallery_id"),
        visible: row.get("visible"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (SqlxSectionRepository, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let page_id = sqlx::query("INSERT INTO pages (slug, title) VALUES ('home', 'Home')")
            .execute(pool.sqlite())
            .await
            .unwrap()
            .last_insert_rowid();
        (SqlxSectionRepository::new(pool), page_id)
    }

    fn section(page_id: i64, heading: &str, visible: bool) -> PageSection {
        PageSection {
            id: 0,
            page_id,
            kind: SectionKind::Text,
            position: 0,
            heading: Some(heading.to_string()),
            body: String::new(),
            body_html: String::new(),
            image_urls: vec![],
            gallery_id: None,
            visible,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_sections_are_appended() {
        let (repo, page_id) = setup().await;
        let a = repo.create(&section(page_id, "a", true)).await.unwrap();
        let b = repo.create(&section(page_id, "b", false)).await.unwrap();
        assert_eq!(a.position, 0);
        assert_eq!(b.position, 1);

        assert_eq!(repo.list_by_page(page_id, false).await.unwrap().len(), 2);
        assert_eq!(repo.list_by_page(page_id, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reorder_and_images() {
        let (repo, page_id) = setup().await;
        let a = repo.create(&section(page_id, "a", true)).await.unwrap();
        let b = repo.create(&section(page_id, "b", true)).await.unwrap();

        repo.reorder(page_id, &[b.id, a.id]).await.unwrap();
        let headings: Vec<_> = repo
            .list_by_page(page_id, false)
            .await
            .unwrap()
            .into_iter()
            .filter_map(|s| s.heading)
            .collect();
        assert_eq!(headings, vec!["b", "a"]);

        let urls = vec!["https://x.test/1.jpg".to_string(), "https://x.test/2.jpg".to_string()];
        assert!(repo.set_images(a.id, &urls).await.unwrap());
        assert_eq!(repo.get_by_id(a.id).await.unwrap().unwrap().image_urls, urls);
        assert!(!repo.set_images(999, &urls).await.unwrap());
    }
}
