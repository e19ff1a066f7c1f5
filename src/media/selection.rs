//! Selection edit state
//!
//! One cover image, an ordered list of supporting images and at most one
//! video. Whenever supporting images exist a cover exists too, and an image
//! appears in at most one slot. A seeded cover may be the poster frame of
//! the seeded video and then shares its public id.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::{AssetDescriptor, AssetKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Asset {0} is not selected")]
    NotSelected(String),

    #[error("Asset {0} is not a supporting image")]
    NotSupporting(String),

    #[error("Cannot move position {from} to {to} in a list of {len}")]
    OutOfRange { from: usize, to: usize, len: usize },
}

/// Where a selected asset landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "slot", content = "index")]
pub enum SelectionSlot {
    Cover,
    Supporting(usize),
    Video,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaSelection {
    cover: Option<AssetDescriptor>,
    supporting: Vec<AssetDescriptor>,
    video: Option<AssetDescriptor>,
}

impl MediaSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from persisted URLs.
    ///
    /// Slots are filled as stored: the cover stays an image even when it is
    /// a poster derived from a video (`/video/upload/so_0/...jpg`), and the
    /// video is not deduplicated against it.
    pub fn from_urls(cover: Option<&str>, images: &[String], video: Option<&str>) -> Self {
        let mut selection = Self::new();
        selection.cover = cover.map(|url| seeded(url, AssetKind::Image));
        for url in images {
            let asset = seeded(url, AssetKind::Image);
            if !selection.images().any(|a| a.public_id == asset.public_id) {
                selection.supporting.push(asset);
            }
        }
        if selection.cover.is_none() && !selection.supporting.is_empty() {
            selection.cover = Some(selection.supporting.remove(0));
        }
        selection.video = video.map(|url| seeded(url, AssetKind::Video));
        selection
    }

    fn images(&self) -> impl Iterator<Item = &AssetDescriptor> {
        self.cover.iter().chain(self.supporting.iter())
    }

    pub fn cover(&self) -> Option<&AssetDescriptor> {
        self.cover.as_ref()
    }

    pub fn supporting(&self) -> &[AssetDescriptor] {
        &self.supporting
    }

    pub fn video(&self) -> Option<&AssetDescriptor> {
        self.video.as_ref()
    }

    pub fn contains(&self, public_id: &str) -> bool {
        self.assets().iter().any(|a| a.public_id == public_id)
    }

    pub fn len(&self) -> usize {
        self.supporting.len() + usize::from(self.cover.is_some()) + usize::from(self.video.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add an asset.
    ///
    /// Videos take the video slot, replacing any previous one. Images become
    /// the cover when there is none and are appended to the supporting list
    /// otherwise. Returns `None` when the asset is already selected.
    pub fn select(&mut self, asset: AssetDescriptor) -> Option<SelectionSlot> {
        if self.contains(&asset.public_id) {
            return None;
        }

        match asset.kind {
            AssetKind::Video => {
                self.video = Some(asset);
                Some(SelectionSlot::Video)
            }
            AssetKind::Image if self.cover.is_none() => {
                self.cover = Some(asset);
                Some(SelectionSlot::Cover)
            }
            AssetKind::Image => {
                self.supporting.push(asset);
                Some(SelectionSlot::Supporting(self.supporting.len() - 1))
            }
        }
    }

    /// Remove an asset from whichever slot holds it.
    ///
    /// Removing the cover promotes the first supporting image. When a poster
    /// cover and the video share a public id the cover goes first.
    pub fn remove(&mut self, public_id: &str) -> Option<AssetDescriptor> {
        if self.cover.as_ref().is_some_and(|c| c.public_id == public_id) {
            let removed = self.cover.take();
            if !self.supporting.is_empty() {
                self.cover = Some(self.supporting.remove(0));
            }
            return removed;
        }

        if self.video.as_ref().is_some_and(|v| v.public_id == public_id) {
            return self.video.take();
        }

        let index = self.supporting.iter().position(|a| a.public_id == public_id)?;
        Some(self.supporting.remove(index))
    }

    /// Make a supporting image the cover; the old cover moves to the front
    /// of the supporting list.
    pub fn set_cover(&mut self, public_id: &str) -> Result<(), SelectionError> {
        if self.cover.as_ref().is_some_and(|c| c.public_id == public_id) {
            return Ok(());
        }

        let index = match self.supporting.iter().position(|a| a.public_id == public_id) {
            Some(index) => index,
            None if self.contains(public_id) => {
                return Err(SelectionError::NotSupporting(public_id.to_string()))
            }
            None => return Err(SelectionError::NotSelected(public_id.to_string())),
        };

        let new_cover = self.supporting.remove(index);
        if let Some(old) = self.cover.replace(new_cover) {
            self.supporting.insert(0, old);
        }
        Ok(())
    }

    /// Move a supporting image from one position to another
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), SelectionError> {
        let len = self.supporting.len();
        if from >= len || to >= len {
            return Err(SelectionError::OutOfRange { from, to, len });
        }
        let asset = self.supporting.remove(from);
        self.supporting.insert(to, asset);
        Ok(())
    }

    /// The selection list: cover, supporting images, video
    pub fn assets(&self) -> Vec<&AssetDescriptor> {
        self.cover
            .iter()
            .chain(self.supporting.iter())
            .chain(self.video.iter())
            .collect()
    }

    pub fn cover_url(&self) -> Option<String> {
        self.cover.as_ref().map(|a| a.url.clone())
    }

    /// Supporting image URLs in order
    pub fn image_urls(&self) -> Vec<String> {
        self.supporting.iter().map(|a| a.url.clone()).collect()
    }

    pub fn video_url(&self) -> Option<String> {
        self.video.as_ref().map(|a| a.url.clone())
    }

    /// All URLs in selection order
    pub fn urls(&self) -> Vec<String> {
        self.assets().into_iter().map(|a| a.url.clone()).collect()
    }
}

/// Descriptor for a persisted URL, keeping the slot's kind over whatever
/// the delivery path says
fn seeded(url: &str, kind: AssetKind) -> AssetDescriptor {
    let mut asset = AssetDescriptor::from_url(url, kind);
    asset.kind = kind;
    asset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str) -> AssetDescriptor {
        AssetDescriptor::from_url(
            &format!("https://res.cloudinary.com/demo/image/upload/v1/{}.jpg", id),
            AssetKind::Image,
        )
    }

    fn video(id: &str) -> AssetDescriptor {
        AssetDescriptor::from_url(
            &format!("https://res.cloudinary.com/demo/video/upload/v1/{}.mp4", id),
            AssetKind::Video,
        )
    }

    fn ids(selection: &MediaSelection) -> Vec<String> {
        selection.assets().iter().map(|a| a.public_id.clone()).collect()
    }

    #[test]
    fn test_first_image_becomes_cover() {
        let mut selection = MediaSelection::new();
        assert_eq!(selection.select(image("a")), Some(SelectionSlot::Cover));
        assert_eq!(selection.select(image("b")), Some(SelectionSlot::Supporting(0)));
        assert_eq!(selection.select(image("c")), Some(SelectionSlot::Supporting(1)));
        assert_eq!(ids(&selection), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicates_ignored() {
        let mut selection = MediaSelection::new();
        selection.select(image("a"));
        assert_eq!(selection.select(image("a")), None);
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_video_replaces_video() {
        let mut selection = MediaSelection::new();
        assert_eq!(selection.select(video("v1")), Some(SelectionSlot::Video));
        selection.select(video("v2"));
        assert_eq!(selection.video().unwrap().public_id, "v2");
        assert!(selection.cover().is_none());
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_removing_cover_promotes_first_supporting() {
        let mut selection = MediaSelection::new();
        selection.select(image("a"));
        selection.select(image("b"));
        selection.select(image("c"));

        assert_eq!(selection.remove("a").unwrap().public_id, "a");
        assert_eq!(selection.cover().unwrap().public_id, "b");
        assert_eq!(ids(&selection), vec!["b", "c"]);

        assert!(selection.remove("missing").is_none());
    }

    #[test]
    fn test_set_cover_swaps() {
        let mut selection = MediaSelection::new();
        selection.select(image("a"));
        selection.select(image("b"));
        selection.select(image("c"));

        selection.set_cover("c").unwrap();
        assert_eq!(ids(&selection), vec!["c", "a", "b"]);

        assert_eq!(
            selection.set_cover("zzz"),
            Err(SelectionError::NotSelected("zzz".to_string()))
        );

        selection.select(video("v"));
        assert_eq!(
            selection.set_cover("v"),
            Err(SelectionError::NotSupporting("v".to_string()))
        );
    }

    #[test]
    fn test_reorder() {
        let mut selection = MediaSelection::new();
        for id in ["cover", "a", "b", "c"] {
            selection.select(image(id));
        }
        selection.reorder(2, 0).unwrap();
        assert_eq!(ids(&selection), vec!["cover", "c", "a", "b"]);
        assert!(selection.reorder(0, 3).is_err());
    }

    #[test]
    fn test_from_urls_and_back() {
        let cover = "https://res.cloudinary.com/demo/image/upload/v1/x/cover.jpg";
        let images = vec!["https://res.cloudinary.com/demo/image/upload/v1/x/1.jpg".to_string()];
        let selection = MediaSelection::from_urls(Some(cover), &images, None);

        assert_eq!(selection.cover_url().as_deref(), Some(cover));
        assert_eq!(selection.image_urls(), images);
        assert_eq!(selection.cover().unwrap().public_id, "x/cover");
        assert!(selection.video_url().is_none());
    }

    #[test]
    fn test_from_urls_keeps_video_poster_as_cover() {
        let poster = "https://res.cloudinary.com/demo/video/upload/so_0/v1/vitrine/clip.jpg";
        let stream = "https://res.cloudinary.com/demo/video/upload/v1/vitrine/clip.mp4";
        let selection = MediaSelection::from_urls(Some(poster), &[], Some(stream));

        let cover = selection.cover().unwrap();
        assert_eq!(cover.url, poster);
        assert!(cover.is_image());
        let video = selection.video().unwrap();
        assert_eq!(video.url, stream);
        assert!(video.is_video());
        assert_eq!(cover.public_id, video.public_id);

        assert_eq!(selection.cover_url().as_deref(), Some(poster));
        assert_eq!(selection.video_url().as_deref(), Some(stream));
        assert!(selection.image_urls().is_empty());
    }

    #[test]
    fn test_poster_cover_removed_before_video() {
        let poster = "https://res.cloudinary.com/demo/video/upload/so_0/v1/vitrine/clip.jpg";
        let stream = "https://res.cloudinary.com/demo/video/upload/v1/vitrine/clip.mp4";
        let mut selection = MediaSelection::from_urls(Some(poster), &[], Some(stream));

        assert_eq!(selection.remove("vitrine/clip").unwrap().url, poster);
        assert!(selection.cover().is_none());
        assert_eq!(selection.video_url().as_deref(), Some(stream));
    }
}
