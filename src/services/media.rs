//! Media item service
//!
//! Saving validates a `MediaDraft` and inserts or updates the row. Deleting
//! removes the row first and then, best effort, every hosted asset the item
//! referenced; host failures are logged and reported, never propagated.

use crate::assets::{parse_delivery_url, DynAssetHost};
use crate::db::repositories::{MediaFilter, MediaRepository};
use crate::models::{viewer_is_member, DeleteReport, MediaDraft, MediaItem, MediaQuery, PagedResult, User};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum MediaServiceError {
    #[error("Media item not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Media item service
pub struct MediaService {
    repo: Arc<dyn MediaRepository>,
    host: DynAssetHost,
}

impl MediaService {
    /// Create a new media service deleting assets through `host`
    pub fn new(repo: Arc<dyn MediaRepository>, host: DynAssetHost) -> Self {
        Self { repo, host }
    }

    /// Insert a new item (`draft.id` is `None`) or update an existing one
    pub async fn save(&self, draft: MediaDraft, author: &User) -> Result<MediaItem, MediaServiceError> {
        draft.validate().map_err(MediaServiceError::ValidationError)?;

        let kind = draft.kind();
        let tags = draft.normalized_tags();
        let title = draft.title.trim().to_string();
        let cover_image = draft.cover_image.unwrap_or_default().trim().to_string();
        let video_url = draft
            .video_url
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let gallery_class = draft
            .gallery_class
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        // The cover is never repeated among the supporting images
        let image_urls: Vec<String> = draft
            .image_urls
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| *u != cover_image)
            .collect();

        match draft.id {
            Some(id) => {
                let existing = self
                    .repo
                    .get_by_id(id)
                    .await
                    .context("Failed to load media item")?
                    .ok_or(MediaServiceError::NotFound(id))?;

                let item = MediaItem {
                    title,
                    description: draft.description,
                    kind,
                    cover_image,
                    image_urls,
                    video_url,
                    tags,
                    premium: draft.premium,
                    gallery_class,
                    ..existing
                };
                let saved = self.repo.update(&item).await.context("Failed to update media item")?;
                tracing::info!(media_id = saved.id, kind = %saved.kind, "Updated media item");
                Ok(saved)
            }
            None => {
                let now = chrono::Utc::now();
                let item = MediaItem {
                    id: 0,
                    title,
                    description: draft.description,
                    kind,
                    cover_image,
                    image_urls,
                    video_url,
                    tags,
                    premium: draft.premium,
                    gallery_class,
                    created_by: Some(author.id),
                    created_at: now,
                    updated_at: now,
                };
                let saved = self.repo.create(&item).await.context("Failed to create media item")?;
                tracing::info!(media_id = saved.id, kind = %saved.kind, "Created media item");
                Ok(saved)
            }
        }
    }

    /// Page of items matching the query; premium items only for members
    pub async fn list(
        &self,
        query: &MediaQuery,
        viewer: Option<&User>,
    ) -> Result<PagedResult<MediaItem>, MediaServiceError> {
        let params = query.params();
        let filter = MediaFilter {
            kind: query.kind,
            tag: query
                .tag
                .as_deref()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty()),
            gallery_class: query
                .gallery_class
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            include_premium: viewer_is_member(viewer),
        };

        let (items, total) = self
            .repo
            .list(&filter, &params)
            .await
            .context("Failed to list media items")?;
        Ok(PagedResult::new(items, total, &params))
    }

    /// Get an item as `viewer` sees it; premium items need a member
    pub async fn get(&self, id: i64, viewer: Option<&User>) -> Result<MediaItem, MediaServiceError> {
        let item = self.get_any(id).await?;
        if item.premium && !viewer_is_member(viewer) {
            return Err(MediaServiceError::PermissionDenied(
                "This item is available to members only".to_string(),
            ));
        }
        Ok(item)
    }

    /// Load an item regardless of premium status
    pub async fn get_any(&self, id: i64) -> Result<MediaItem, MediaServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to load media item")?
            .ok_or(MediaServiceError::NotFound(id))
    }

    /// Delete the row, then its hosted assets
    pub async fn delete(&self, id: i64) -> Result<DeleteReport, MediaServiceError> {
        let item = self.get_any(id).await?;
        if !self.repo.delete(id).await.context("Failed to delete media item")? {
            return Err(MediaServiceError::NotFound(id));
        }

        let mut report = DeleteReport {
            id,
            ..DeleteReport::default()
        };
        for asset in item.assets() {
            // Foreign URLs are not ours to delete
            if parse_delivery_url(&asset.url).is_none() {
                tracing::debug!(url = %asset.url, "Skipping asset not served by the host");
                continue;
            }
            match self.host.delete(&asset.public_id, asset.kind).await {
                Ok(found) => {
                    if !found {
                        tracing::debug!(public_id = %asset.public_id, "Asset already gone from host");
                    }
                    report.removed.push(asset.public_id);
                }
                Err(e) => {
                    tracing::warn!(public_id = %asset.public_id, error = %e, "Failed to delete asset from host");
                    report.failed.push(asset.public_id);
                }
            }
        }

        tracing::info!(
            media_id = id,
            removed = report.removed.len(),
            failed = report.failed.len(),
            "Deleted media item"
        );
        Ok(report)
    }
}
