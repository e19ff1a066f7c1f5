//! In-process asset host
//!
//! Keeps descriptors in memory and serves delivery URLs that follow the same
//! `{kind}/upload/v{n}/{public_id}.{ext}` layout as the real host, so
//! `public_id_from_url` works on them.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{
    AssetDescriptor, AssetError, AssetHost, AssetKind, AssetListRequest, AssetPage, AssetResult,
    UploadSource,
};

const BASE_URL: &str = "https://assets.local";

/// Asset host backed by a vector, newest first
#[derive(Debug, Default)]
pub struct MemoryAssetHost {
    folder: String,
    assets: RwLock<Vec<AssetDescriptor>>,
    offline: AtomicBool,
}

impl MemoryAssetHost {
    pub fn new(folder: &str) -> Self {
        Self {
            folder: folder.trim_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Make every call fail with a network error until switched back
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored assets
    pub async fn len(&self) -> usize {
        self.assets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether an asset with this public id is stored
    pub async fn contains(&self, public_id: &str) -> bool {
        self.assets
            .read()
            .await
            .iter()
            .any(|a| a.public_id == public_id)
    }

    fn check_online(&self) -> AssetResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AssetError::Network("memory host is offline".to_string()));
        }
        Ok(())
    }

    fn new_public_id(&self) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        if self.folder.is_empty() {
            id
        } else {
            format!("{}/{}", self.folder, id)
        }
    }
}

fn extension_of(name: &str, kind: AssetKind) -> String {
    let name = name.split(['?', '#']).next().unwrap_or(name);
    name.rsplit('/')
        .next()
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| match kind {
            AssetKind::Image => "jpg".to_string(),
            AssetKind::Video => "mp4".to_string(),
        })
}

#[async_trait]
impl AssetHost for MemoryAssetHost {
    async fn list(&self, request: &AssetListRequest) -> AssetResult<AssetPage> {
        self.check_online()?;

        let offset = match &request.cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| AssetError::Rejected {
                    status: 400,
                    message: format!("Invalid cursor: {}", cursor),
                })?,
            None => 0,
        };
        let query = request.query.as_deref().map(str::to_lowercase);

        let assets = self.assets.read().await;
        let matching: Vec<&AssetDescriptor> = assets
            .iter()
            .filter(|a| request.filter.matches(a.kind))
            .filter(|a| match &query {
                Some(q) => a.public_id.to_lowercase().contains(q),
                None => true,
            })
            .collect();

        let limit = request.page_size() as usize;
        let page: Vec<AssetDescriptor> = matching
            .iter()
            .skip(offset)
            .take(limit)
            .map(|a| (*a).clone())
            .collect();
        let next = offset + page.len();

        Ok(AssetPage {
            assets: page,
            next_cursor: (next < matching.len()).then(|| next.to_string()),
        })
    }

    async fn upload(&self, source: UploadSource) -> AssetResult<AssetDescriptor> {
        self.check_online()?;

        let kind = source.kind();
        let (ext, bytes) = match &source {
            UploadSource::File { filename, data, .. } => (extension_of(filename, kind), Some(data.len() as u64)),
            UploadSource::RemoteUrl(url) => (extension_of(url, kind), None),
        };

        let public_id = self.new_public_id();
        let now = Utc::now();
        let descriptor = AssetDescriptor {
            url: format!(
                "{}/{}/upload/v{}/{}.{}",
                BASE_URL,
                kind.resource_type(),
                now.timestamp(),
                public_id,
                ext
            ),
            public_id,
            kind,
            format: Some(ext),
            bytes,
            width: None,
            height: None,
            duration: None,
            created_at: Some(now),
        };

        self.assets.write().await.insert(0, descriptor.clone());
        Ok(descriptor)
    }

    async fn delete(&self, public_id: &str, kind: AssetKind) -> AssetResult<bool> {
        self.check_online()?;

        let mut assets = self.assets.write().await;
        let before = assets.len();
        assets.retain(|a| !(a.public_id == public_id && a.kind == kind));
        Ok(assets.len() < before)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{public_id_from_url, AssetFilter};

    fn image(name: &str) -> UploadSource {
        UploadSource::File {
            filename: name.to_string(),
            content_type: "image/png".to_string(),
            data: vec![0u8; 16],
        }
    }

    #[tokio::test]
    async fn test_upload_then_list_newest_first() {
        let host = MemoryAssetHost::new("vitrine");
        let first = host.upload(image("a.png")).await.unwrap();
        let second = host.upload(image("b.png")).await.unwrap();

        let page = host.list(&AssetListRequest::new(AssetFilter::All, 10)).await.unwrap();
        assert_eq!(page.assets.len(), 2);
        assert_eq!(page.assets[0].public_id, second.public_id);
        assert_eq!(page.assets[1].public_id, first.public_id);
        assert!(page.next_cursor.is_none());
        assert_eq!(first.bytes, Some(16));
    }

    #[tokio::test]
    async fn test_urls_parse_back_to_public_id() {
        let host = MemoryAssetHost::new("vitrine");
        let asset = host
            .upload(UploadSource::RemoteUrl("https://example.com/clip.webm".to_string()))
            .await
            .unwrap();

        assert_eq!(asset.kind, AssetKind::Video);
        assert!(asset.public_id.starts_with("vitrine/"));
        assert_eq!(public_id_from_url(&asset.url), Some(asset.public_id.clone()));
    }

    #[tokio::test]
    async fn test_cursor_pagination() {
        let host = MemoryAssetHost::new("");
        for i in 0..5 {
            host.upload(image(&format!("{}.png", i))).await.unwrap();
        }

        let mut request = AssetListRequest::new(AssetFilter::Image, 2);
        let mut seen = Vec::new();
        loop {
            let page = host.list(&request).await.unwrap();
            seen.extend(page.assets.into_iter().map(|a| a.public_id));
            match page.next_cursor {
                Some(cursor) => request.cursor = Some(cursor),
                None => break,
            }
        }
        assert_eq!(seen.len(), 5);

        let videos = host.list(&AssetListRequest::new(AssetFilter::Video, 10)).await.unwrap();
        assert!(videos.assets.is_empty());
    }

    #[tokio::test]
    async fn test_delete_reports_missing() {
        let host = MemoryAssetHost::new("vitrine");
        let asset = host.upload(image("a.png")).await.unwrap();

        assert!(host.delete(&asset.public_id, AssetKind::Image).await.unwrap());
        assert!(!host.delete(&asset.public_id, AssetKind::Image).await.unwrap());
        assert!(host.is_empty().await);
    }

    #[tokio::test]
    async fn test_offline_fails_with_network_error() {
        let host = MemoryAssetHost::new("vitrine");
        host.set_offline(true);
        let err = host.list(&AssetListRequest::new(AssetFilter::All, 10)).await.unwrap_err();
        assert!(matches!(err, AssetError::Network(_)));

        host.set_offline(false);
        assert!(host.upload(image("a.png")).await.is_ok());
    }

    #[test]
    fn test_extension_fallback() {
        assert_eq!(extension_of("photo.JPEG", AssetKind::Image), "jpeg");
        assert_eq!(extension_of("https://x.test/noext", AssetKind::Video), "mp4");
        assert_eq!(extension_of("https://x.test/a.png?w=1", AssetKind::Image), "png");
    }
}
