//! Gallery repository
//!
//! Gallery membership lives in `gallery_items`, ordered by `position`.

use super::media::row_to_media_item;
use crate::db::DynDatabasePool;
use crate::models::{GallerySet, GalleryWithCount, MediaItem};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait GalleryRepository: Send + Sync {
    /// Insert a gallery, returning it with its new ID
    async fn create(&self, gallery: &GallerySet) -> Result<GallerySet>;
    /// Get a gallery by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<GallerySet>>;
    /// Update title, description and classification
    async fn update(&self, gallery: &GallerySet) -> Result<GallerySet>;
    /// Delete a gallery and its memberships; media rows are untouched
    async fn delete(&self, id: i64) -> Result<bool>;
    /// All galleries, newest first, with their member counts
    async fn list_with_counts(&self) -> Result<Vec<GalleryWithCount>>;

    /// Member items in gallery order
    async fn items(&self, gallery_id: i64, include_premium: bool) -> Result<Vec<MediaItem>>;

    /// Member ids in gallery order
    async fn item_ids(&self, gallery_id: i64) -> Result<Vec<i64>>;

    /// Append an item; false when it is already a member
    async fn add_item(&self, gallery_id: i64, media_id: i64) -> Result<bool>;

    /// Remove a member; `false` when it was not in the gallery
    async fn remove_item(&self, gallery_id: i64, media_id: i64) -> Result<bool>;

    /// Rewrite member positions to follow `ordered_ids`
    async fn reorder(&self, gallery_id: i64, ordered_ids: &[i64]) -> Result<()>;
}

/// SQLx-based gallery repository implementation
pub struct SqlxGalleryRepository {
    pool: DynDatabasePool,
}

impl SqlxGalleryRepository {
    /// Create a new SQLx gallery repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn GalleryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl GalleryRepository for SqlxGalleryRepository {
    async fn create(&self, gallery: &GallerySet) -> Result<GallerySet> {
        create_gallery_sqlite(self.pool.sqlite(), gallery).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<GallerySet>> {
        let row = sqlx::query("SELECT * FROM gallery_sets WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get gallery by ID")?;
        Ok(row.map(|r| row_to_gallery(&r)))
    }

    async fn update(&self, gallery: &GallerySet) -> Result<GallerySet> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE gallery_sets SET title = ?, description = ?, classification = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&gallery.title)
        .bind(&gallery.description)
        .bind(&gallery.classification)
        .bind(now)
        .bind(gallery.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update gallery")?;

        Ok(GallerySet {
            updated_at: now,
            ..gallery.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM gallery_sets WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete gallery")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_with_counts(&self) -> Result<Vec<GalleryWithCount>> {
        let rows = sqlx::query(
            r#"
            SELECT g.*, (SELECT COUNT(*) FROM gallery_items gi WHERE gi.gallery_id = g.id) AS item_count
            FROM gallery_sets g
            ORDER BY g.created_at DESC, g.id DESC
            "#,
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list galleries")?;

        Ok(rows
            .iter()
            .map(|row| GalleryWithCount {
                gallery: row_to_gallery(row),
                item_count: row.get("item_count"),
            })
            .collect())
    }

    async fn items(&self, gallery_id: i64, include_premium: bool) -> Result<Vec<MediaItem>> {
        let sql = format!(
            r#"
            SELECT m.* FROM media_items m
            JOIN gallery_items gi ON gi.media_id = m.id
            WHERE gi.gallery_id = ? {}
            ORDER BY gi.position, m.id
            "#,
            if include_premium { "" } else { "AND m.premium = 0" }
        );
        let rows = sqlx::query(&sql)
            .bind(gallery_id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list gallery items")?;
        rows.iter().map(row_to_media_item).collect()
    }

    async fn item_ids(&self, gallery_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar("SELECT media_id FROM gallery_items WHERE gallery_id = ? ORDER BY position, media_id")
            .bind(gallery_id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list gallery item ids")?;
        Ok(ids)
    }

    async fn add_item(&self, gallery_id: i64, media_id: i64) -> Result<bool> {
        add_item_sqlite(self.pool.sqlite(), gallery_id, media_id).await
    }

    async fn remove_item(&self, gallery_id: i64, media_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM gallery_items WHERE gallery_id = ? AND media_id = ?")
            .bind(gallery_id)
            .bind(media_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to remove gallery item")?;
        Ok(result.rows_affected() > 0)
    }

    async fn reorder(&self, gallery_id: i64, ordered_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.sqlite().begin().await.context("Failed to begin transaction")?;
        for (position, media_id) in ordered_ids.iter().enumerate() {
            sqlx::query("UPDATE gallery_items SET position = ? WHERE gallery_id = ? AND media_id = ?")
                .bind(position as i64)
                .bind(gallery_id)
                .bind(media_id)
                .execute(&mut *tx)
                .await
                .context("Failed to reorder gallery")?;
        }
        tx.commit().await.context("Failed to commit gallery order")?;
        Ok(())
    }
}

async fn create_gallery_sqlite(pool: &SqlitePool, gallery: &GallerySet) -> Result<GallerySet> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO gallery_sets (title, description, classification, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&gallery.title)
    .bind(&gallery.description)
    .bind(&gallery.classification)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create gallery")?;

    Ok(GallerySet {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..gallery.clone()
    })
}

async fn add_item_sqlite(pool: &SqlitePool, gallery_id: i64, media_id: i64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO gallery_items (gallery_id, media_id, position)
        VALUES (?, ?, (SELECT COALESCE(MAX(position) + 1, 0) FROM gallery_items WHERE gallery_id = ?))
        "#,
    )
    .bind(gallery_id)
    .bind(media_id)
    .bind(gallery_id)
    .execute(pool)
    .await
    .context("Failed to add gallery item")?;
    Ok(result.rows_affected() > 0)
}

fn row_to_gallery(row: &SqliteRow) -> GallerySet {
    GallerySet {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        classification: row.get("classification"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
