//! Media item repository
//!
//! `image_urls` and `tags` are stored as JSON arrays in TEXT columns.

use crate::assets::AssetKind;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, MediaItem};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Listing filter, already normalised by the service
#[derive(Debug, Clone, Default)]
pub struct MediaFilter {
    pub kind: Option<AssetKind>,
    pub tag: Option<String>,
    pub gallery_class: Option<String>,
    pub include_premium: bool,
}

#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Insert a media item, returning it with its new ID
    async fn create(&self, item: &MediaItem) -> Result<MediaItem>;
    /// Get a media item by ID, premium or not
    async fn get_by_id(&self, id: i64) -> Result<Option<MediaItem>>;
    /// Overwrite the editable columns and bump `updated_at`
    async fn update(&self, item: &MediaItem) -> Result<MediaItem>;
    /// Delete a media item; memberships and comments cascade
    async fn delete(&self, id: i64) -> Result<bool>;
    /// Newest first
    async fn list(&self, filter: &MediaFilter, params: &ListParams) -> Result<(Vec<MediaItem>, i64)>;
}

/// SQLx-based media item repository implementation
pub struct SqlxMediaRepository {
    pool: DynDatabasePool,
}

impl SqlxMediaRepository {
    /// Create a new SQLx media repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MediaRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MediaRepository for SqlxMediaRepository {
    async fn create(&self, item: &MediaItem) -> Result<MediaItem> {
        create_media_sqlite(self.pool.sqlite(), item).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<MediaItem>> {
        let row = sqlx::query("SELECT * FROM media_items WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get media item by ID")?;
        row.map(|r| row_to_media_item(&r)).transpose()
    }

    async fn update(&self, item: &MediaItem) -> Result<MediaItem> {
        update_media_sqlite(self.pool.sqlite(), item).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM media_items WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete media item")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &MediaFilter, params: &ListParams) -> Result<(Vec<MediaItem>, i64)> {
        list_media_sqlite(self.pool.sqlite(), filter, params).await
    }
}

async fn create_media_sqlite(pool: &SqlitePool, item: &MediaItem) -> Result<MediaItem> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO media_items
            (title, description, kind, cover_image, image_urls, video_url, tags, premium, gallery_class,
             created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&item.title)
    .bind(&item.description)
    .bind(item.kind.to_string())
    .bind(&item.cover_image)
    .bind(serde_json::to_string(&item.image_urls)?)
    .bind(&item.video_url)
    .bind(serde_json::to_string(&item.tags)?)
    .bind(item.premium)
    .bind(&item.gallery_class)
    .bind(item.created_by)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create media item")?;

    Ok(MediaItem {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..item.clone()
    })
}

async fn update_media_sqlite(pool: &SqlitePool, item: &MediaItem) -> Result<MediaItem> {
    let now = Utc::now();
    sqlx::query(
        r#"
        UPDATE media_items
        SET title = ?, description = ?, kind = ?, cover_image = ?, image_urls = ?, video_url = ?,
            tags = ?, premium = ?, gallery_class = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&item.title)
    .bind(&item.description)
    .bind(item.kind.to_string())
    .bind(&item.cover_image)
    .bind(serde_json::to_string(&item.image_urls)?)
    .bind(&item.video_url)
    .bind(serde_json::to_string(&item.tags)?)
    .bind(item.premium)
    .bind(&item.gallery_class)
    .bind(now)
    .bind(item.id)
    .execute(pool)
    .await
    .context("Failed to update media item")?;

    Ok(MediaItem {
        updated_at: now,
        ..item.clone()
    })
}

async fn list_media_sqlite(
    pool: &SqlitePool,
    filter: &MediaFilter,
    params: &ListParams,
) -> Result<(Vec<MediaItem>, i64)> {
    let mut conditions: Vec<&str> = Vec::new();
    let mut binds: Vec<String> = Vec::new();

    if let Some(kind) = filter.kind {
        conditions.push("kind = ?");
        binds.push(kind.to_string());
    }
    if let Some(tag) = &filter.tag {
        conditions.push("EXISTS (SELECT 1 FROM json_each(media_items.tags) WHERE json_each.value = ?)");
        binds.push(tag.clone());
    }
    if let Some(class) = &filter.gallery_class {
        conditions.push("gallery_class = ?");
        binds.push(class.clone());
    }
    if !filter.include_premium {
        conditions.push("premium = 0");
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM media_items {}", where_clause);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for value in &binds {
        count_query = count_query.bind(value);
    }
    let total = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count media items")?;

    let sql = format!(
        "SELECT * FROM media_items {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        where_clause
    );
    let mut query = sqlx::query(&sql);
    for value in &binds {
        query = query.bind(value);
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list media items")?;

    let items = rows.iter().map(row_to_media_item).collect::<Result<Vec<_>>>()?;
    tracing::debug!(total, returned = items.len(), page = params.page, "Listed media items");
    Ok((items, total))
}

/// Shared with the gallery repository, which selects `media_items.*`
pub(crate) fn row_to_media_item(row: &SqliteRow) -> Result<MediaItem> {
    let kind: String = row.get("kind");
    let image_urls: String = row.get("image_urls");
    let tags: String = row.get("tags");
    Ok(MediaItem {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        kind: AssetKind::from_str(&kind)?,
        cover_image: row.get("cover_image"),
        image_urls: serde_json::from_str(&image_urls).context("Corrupt media image list")?,
        video_url: row.get("video_url"),
        tags: serde_json::from_str(&tags).context("Corrupt media tag list")?,
        premium: row.get("premium"),
        gallery_class: row.get("gallery_class"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
