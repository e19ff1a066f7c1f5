//! Gallery service

use crate::db::repositories::{GalleryRepository, MediaRepository};
use crate::models::{
    viewer_is_member, CreateGalleryInput, GallerySet, GalleryWithCount, GalleryWithItems, UpdateGalleryInput, User,
};
use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum GalleryServiceError {
    #[error("Gallery not found: {0}")]
    NotFound(i64),

    #[error("Media item not found: {0}")]
    MediaNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Gallery service for curated sets of media items
pub struct GalleryService {
    repo: Arc<dyn GalleryRepository>,
    media_repo: Arc<dyn MediaRepository>,
}

impl GalleryService {
    /// Create a new gallery service
    pub fn new(repo: Arc<dyn GalleryRepository>, media_repo: Arc<dyn MediaRepository>) -> Self {
        Self { repo, media_repo }
    }

    /// Create an empty gallery
    pub async fn create(&self, input: CreateGalleryInput) -> Result<GallerySet, GalleryServiceError> {
        let title = validate_title(&input.title)?;
        let now = chrono::Utc::now();
        let gallery = GallerySet {
            id: 0,
            title,
            description: input.description,
            classification: normalize_class(input.classification),
            created_at: now,
            updated_at: now,
        };
        let created = self.repo.create(&gallery).await.context("Failed to create gallery")?;
        tracing::info!(gallery_id = created.id, "Created gallery");
        Ok(created)
    }

    /// Update a gallery; absent fields are left unchanged
    pub async fn update(&self, id: i64, input: UpdateGalleryInput) -> Result<GallerySet, GalleryServiceError> {
        let mut gallery = self.get_set(id).await?;
        if let Some(title) = input.title {
            gallery.title = validate_title(&title)?;
        }
        if let Some(description) = input.description {
            gallery.description = description;
        }
        if let Some(classification) = input.classification {
            gallery.classification = normalize_class(classification);
        }
        Ok(self.repo.update(&gallery).await.context("Failed to update gallery")?)
    }

    /// Delete a gallery; its media items are kept
    pub async fn delete(&self, id: i64) -> Result<(), GalleryServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete gallery")? {
            return Err(GalleryServiceError::NotFound(id));
        }
        tracing::info!(gallery_id = id, "Deleted gallery");
        Ok(())
    }

    /// All galleries with their item counts
    pub async fn list(&self) -> Result<Vec<GalleryWithCount>, GalleryServiceError> {
        Ok(self.repo.list_with_counts().await?)
    }

    /// Gallery with its items in order; premium items only for members
    pub async fn get(&self, id: i64, viewer: Option<&User>) -> Result<GalleryWithItems, GalleryServiceError> {
        let gallery = self.get_set(id).await?;
        let items = self
            .repo
            .items(id, viewer_is_member(viewer))
            .await
            .context("Failed to load gallery items")?;
        Ok(GalleryWithItems { gallery, items })
    }

    /// Append an item. Adding a member again is a no-op.
    pub async fn add_item(&self, id: i64, media_id: i64) -> Result<bool, GalleryServiceError> {
        self.get_set(id).await?;
        if self.media_repo.get_by_id(media_id).await?.is_none() {
            return Err(GalleryServiceError::MediaNotFound(media_id));
        }
        Ok(self.repo.add_item(id, media_id).await?)
    }

    /// Take an item out of a gallery; the item itself is kept
    pub async fn remove_item(&self, id: i64, media_id: i64) -> Result<(), GalleryServiceError> {
        self.get_set(id).await?;
        if !self.repo.remove_item(id, media_id).await? {
            return Err(GalleryServiceError::MediaNotFound(media_id));
        }
        Ok(())
    }

    /// Reorder members; `ordered_ids` must list every member exactly once
    pub async fn reorder(&self, id: i64, ordered_ids: &[i64]) -> Result<(), GalleryServiceError> {
        self.get_set(id).await?;
        let current: HashSet<i64> = self.repo.item_ids(id).await?.into_iter().collect();
        let requested: HashSet<i64> = ordered_ids.iter().copied().collect();

        if requested.len() != ordered_ids.len() || requested != current {
            return Err(GalleryServiceError::ValidationError(
                "Order must list every gallery item exactly once".to_string(),
            ));
        }
        Ok(self.repo.reorder(id, ordered_ids).await?)
    }

    async fn get_set(&self, id: i64) -> Result<GallerySet, GalleryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to load gallery")?
            .ok_or(GalleryServiceError::NotFound(id))
    }
}

fn validate_title(title: &str) -> Result<String, GalleryServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(GalleryServiceError::ValidationError("Title is required".to_string()));
    }
    if title.chars().count() > 255 {
        return Err(GalleryServiceError::ValidationError(
            "Title must be at most 255 characters".to_string(),
        ));
    }
    Ok(title.to_string())
}

fn normalize_class(class: Option<String>) -> Option<String> {
    class.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}
