//! Media item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assets::{AssetDescriptor, AssetKind};

/// A published piece of media: an image set or a video, with its cover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub kind: AssetKind,
    /// Cover image URL (always set)
    pub cover_image: String,
    /// Supporting image URLs, in display order. Never contains the cover.
    pub image_urls: Vec<String>,
    pub video_url: Option<String>,
    pub tags: Vec<String>,
    pub premium: bool,
    pub gallery_class: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaItem {
    /// Descriptors for every hosted asset this item references
    pub fn assets(&self) -> Vec<AssetDescriptor> {
        let mut assets = vec![AssetDescriptor::from_url(&self.cover_image, AssetKind::Image)];
        assets.extend(
            self.image_urls
                .iter()
                .map(|url| AssetDescriptor::from_url(url, AssetKind::Image)),
        );
        if let Some(url) = &self.video_url {
            assets.push(AssetDescriptor::from_url(url, AssetKind::Video));
        }
        assets
    }
}

/// Unsaved media item state, as the editor submits it.
///
/// `id` is `None` for a new item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaDraft {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub premium: bool,
    #[serde(default)]
    pub gallery_class: Option<String>,
}

impl MediaDraft {
    /// Kind implied by the draft's content
    pub fn kind(&self) -> AssetKind {
        if self.video_url.as_deref().is_some_and(|v| !v.trim().is_empty()) {
            AssetKind::Video
        } else {
            AssetKind::Image
        }
    }

    /// Check the item invariants, returning the first violation
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        if self.title.chars().count() > 255 {
            return Err("Title must be at most 255 characters".to_string());
        }
        if self.cover_image.as_deref().map_or(true, |c| c.trim().is_empty()) {
            return Err("A cover image is required".to_string());
        }
        if self.kind() == AssetKind::Video && !self.image_urls.is_empty() {
            return Err("A video item cannot have supporting images".to_string());
        }
        if self.image_urls.iter().any(|u| u.trim().is_empty()) {
            return Err("Image URLs must not be empty".to_string());
        }
        Ok(())
    }

    /// Trimmed, lowercased, deduplicated tags in first-seen order
    pub fn normalized_tags(&self) -> Vec<String> {
        normalize_tags(&self.tags)
    }
}

pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Filters for listing media items
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaQuery {
    #[serde(default, rename = "type")]
    pub kind: Option<AssetKind>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub gallery_class: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

impl MediaQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page.unwrap_or(1), self.per_page.unwrap_or(20))
    }
}

/// Result of deleting a media item: which hosted assets went with it
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteReport {
    pub id: i64,
    pub removed: Vec<String>,
    pub failed: Vec<String>,
}

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        (self.total.max(0) as u32).div_ceil(self.per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> MediaDraft {
        MediaDraft {
            title: "Sunset".to_string(),
            cover_image: Some("https://res.cloudinary.com/d/image/upload/v1/c.jpg".to_string()),
            ..MediaDraft::default()
        }
    }

    #[test]
    fn test_validate_requires_title_and_cover() {
        assert!(draft().validate().is_ok());

        let mut no_title = draft();
        no_title.title = "   ".to_string();
        assert!(no_title.validate().is_err());

        let mut no_cover = draft();
        no_cover.cover_image = None;
        assert_eq!(no_cover.validate().unwrap_err(), "A cover image is required");
    }

    #[test]
    fn test_video_items_have_no_supporting_images() {
        let mut video = draft();
        video.video_url = Some("https://res.cloudinary.com/d/video/upload/v1/v.mp4".to_string());
        assert_eq!(video.kind(), AssetKind::Video);
        assert!(video.validate().is_ok());

        video.image_urls.push("https://res.cloudinary.com/d/image/upload/v1/x.jpg".to_string());
        assert!(video.validate().is_err());
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec![" Travel ".to_string(), "travel".to_string(), "".to_string(), "Sea".to_string()];
        assert_eq!(normalize_tags(&tags), vec!["travel", "sea"]);
    }

    #[test]
    fn test_item_assets_order() {
        let now = Utc::now();
        let item = MediaItem {
            id: 1,
            title: "t".to_string(),
            description: String::new(),
            kind: AssetKind::Image,
            cover_image: "https://res.cloudinary.com/d/image/upload/v1/c.jpg".to_string(),
            image_urls: vec!["https://res.cloudinary.com/d/image/upload/v1/s.jpg".to_string()],
            video_url: None,
            tags: vec![],
            premium: false,
            gallery_class: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        let ids: Vec<_> = item.assets().into_iter().map(|a| a.public_id).collect();
        assert_eq!(ids, vec!["c", "s"]);
    }

    #[test]
    fn test_list_params_and_pages() {
        let params = ListParams::new(0, 500);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
        assert_eq!(ListParams::new(3, 10).offset(), 20);

        let result: PagedResult<i32> = PagedResult::new(vec![], 21, &ListParams::new(1, 10));
        assert_eq!(result.total_pages(), 3);
    }
}
