//! Remote asset host
//!
//! Uploaded images and videos live on a hosted media service. This module
//! defines the vocabulary shared by the media dialog and the media services
//! (`AssetDescriptor`, `AssetPage`, `UploadSource`) and the `AssetHost` trait
//! every backend implements:
//!
//! - `CloudinaryHost`: the production backend
//! - `MemoryAssetHost`: process-local store for development and tests

mod cloudinary;
mod memory;

pub use cloudinary::CloudinaryHost;
pub use memory::MemoryAssetHost;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{AssetHostConfig, AssetHostDriver};

/// Largest page the host will return for one listing request
pub const MAX_LIST_RESULTS: u32 = 500;

/// Asset host errors
#[derive(Debug, Error)]
pub enum AssetError {
    /// The host could not be reached or the request failed in transit
    #[error("Asset host unreachable: {0}")]
    Network(String),

    /// The host answered with an error status
    #[error("Asset host rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The host answered with something we could not read
    #[error("Unexpected asset host response: {0}")]
    InvalidResponse(String),

    #[error("Asset host configuration error: {0}")]
    Config(String),
}

pub type AssetResult<T> = Result<T, AssetError>;

/// Media kind of a hosted asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    #[default]
    Image,
    Video,
}

impl AssetKind {
    /// Resource type segment used in host URLs and API paths
    pub fn resource_type(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Video => "video",
        }
    }

    /// Kind implied by a MIME type, if it is a media type at all
    pub fn from_mime(mime: &str) -> Option<Self> {
        if mime.starts_with("image/") {
            Some(AssetKind::Image)
        } else if mime.starts_with("video/") {
            Some(AssetKind::Video)
        } else {
            None
        }
    }

    /// Kind implied by a URL's file extension; unknown extensions are images
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let ext = path
            .rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_lowercase());
        match ext.as_deref() {
            Some("mp4" | "webm" | "mov" | "m4v" | "ogv" | "mkv") => AssetKind::Video,
            _ => AssetKind::Image,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_type())
    }
}

impl FromStr for AssetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(AssetKind::Image),
            "video" => Ok(AssetKind::Video),
            _ => Err(anyhow::anyhow!("Invalid asset kind: {}", s)),
        }
    }
}

/// Which kinds an asset listing should include
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetFilter {
    Image,
    Video,
    #[default]
    All,
}

impl AssetFilter {
    pub fn matches(&self, kind: AssetKind) -> bool {
        match self {
            AssetFilter::Image => kind == AssetKind::Image,
            AssetFilter::Video => kind == AssetKind::Video,
            AssetFilter::All => true,
        }
    }
}

impl FromStr for AssetFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" | "images" => Ok(AssetFilter::Image),
            "video" | "videos" => Ok(AssetFilter::Video),
            "all" | "" => Ok(AssetFilter::All),
            _ => Err(anyhow::anyhow!("Invalid asset filter: {}", s)),
        }
    }
}

/// A hosted asset as the browser and selection see it.
///
/// `public_id` is the identity: two descriptors with the same public id are
/// the same asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub public_id: String,
    pub kind: AssetKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AssetDescriptor {
    /// Rebuild a descriptor from a persisted delivery URL.
    ///
    /// URLs that do not follow the host's delivery layout keep the URL itself
    /// as their identity.
    pub fn from_url(url: &str, kind: AssetKind) -> Self {
        let (public_id, kind) = match parse_delivery_url(url) {
            Some(parsed) => (parsed.public_id, parsed.kind),
            None => (url.to_string(), kind),
        };
        Self {
            public_id,
            kind,
            url: url.to_string(),
            format: None,
            bytes: None,
            width: None,
            height: None,
            duration: None,
            created_at: None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == AssetKind::Image
    }

    pub fn is_video(&self) -> bool {
        self.kind == AssetKind::Video
    }
}

impl PartialEq for AssetDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.public_id == other.public_id
    }
}

/// One page of an asset listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetPage {
    pub assets: Vec<AssetDescriptor>,
    pub next_cursor: Option<String>,
}

/// Parameters for one listing request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetListRequest {
    pub filter: AssetFilter,
    pub max_results: u32,
    pub cursor: Option<String>,
    pub query: Option<String>,
}

impl AssetListRequest {
    pub fn new(filter: AssetFilter, max_results: u32) -> Self {
        Self {
            filter,
            max_results,
            cursor: None,
            query: None,
        }
    }

    /// `max_results` clamped to what the host accepts
    pub fn page_size(&self) -> u32 {
        self.max_results.clamp(1, MAX_LIST_RESULTS)
    }
}

/// Something to send to the asset host
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// Bytes received from the client
    File {
        filename: String,
        content_type: String,
        data: Vec<u8>,
    },
    /// A remote URL the host fetches itself
    RemoteUrl(String),
}

impl UploadSource {
    /// Kind the uploaded asset will have
    pub fn kind(&self) -> AssetKind {
        match self {
            UploadSource::File { content_type, filename, .. } => {
                AssetKind::from_mime(content_type).unwrap_or_else(|| AssetKind::from_url(filename))
            }
            UploadSource::RemoteUrl(url) => AssetKind::from_url(url),
        }
    }

    /// Human-readable name for error reports
    pub fn label(&self) -> &str {
        match self {
            UploadSource::File { filename, .. } => filename,
            UploadSource::RemoteUrl(url) => url,
        }
    }
}

/// Asset host abstraction
///
/// Implementations never retry; a failed call surfaces as an `AssetError`.
#[async_trait]
pub trait AssetHost: Send + Sync {
    /// List one page of assets, newest first
    async fn list(&self, request: &AssetListRequest) -> AssetResult<AssetPage>;

    /// Upload a file or remote URL and return the stored asset
    async fn upload(&self, source: UploadSource) -> AssetResult<AssetDescriptor>;

    /// Delete an asset; `Ok(false)` when the host does not know it
    async fn delete(&self, public_id: &str, kind: AssetKind) -> AssetResult<bool>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

pub type DynAssetHost = Arc<dyn AssetHost>;

/// Create the asset host selected by configuration
pub fn create_asset_host(config: &AssetHostConfig) -> AssetResult<DynAssetHost> {
    match config.driver {
        AssetHostDriver::Cloudinary => Ok(Arc::new(CloudinaryHost::new(config)?)),
        AssetHostDriver::Memory => Ok(Arc::new(MemoryAssetHost::new(&config.folder))),
    }
}

/// Parts recovered from a delivery URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryUrl {
    pub kind: AssetKind,
    pub public_id: String,
}

// <anything>/{image|video}/{upload|private|authenticated}/<rest>
static DELIVERY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?:)?//[^/]+(?:/[^/]+)*?/(image|video)/(?:upload|private|authenticated)/(.+)$")
        .expect("valid delivery url regex")
});

static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v\d+$").expect("valid version regex"));

// A transformation segment is a comma list of `x_value` parameters, e.g. `c_fill,w_300`
static TRANSFORM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{1,3}_[^,]+(?:,[a-z]{1,3}_[^,]+)*$").expect("valid transform regex"));

/// Split a delivery URL into kind and public id
pub fn parse_delivery_url(url: &str) -> Option<DeliveryUrl> {
    let url = url.split(['?', '#']).next()?;
    let caps = DELIVERY_RE.captures(url)?;
    let kind: AssetKind = caps.get(1)?.as_str().parse().ok()?;
    let segments: Vec<&str> = caps.get(2)?.as_str().split('/').filter(|s| !s.is_empty()).collect();

    let start = match segments.iter().position(|s| VERSION_RE.is_match(s)) {
        Some(version) => version + 1,
        None => segments
            .iter()
            .take_while(|s| TRANSFORM_RE.is_match(s))
            .count(),
    };

    let rest = segments.get(start..)?;
    let (last, folders) = rest.split_last()?;
    let stem = match last.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => last,
    };

    let mut public_id = folders.join("/");
    if !public_id.is_empty() {
        public_id.push('/');
    }
    public_id.push_str(&urlencoding::decode(stem).ok()?);

    Some(DeliveryUrl { kind, public_id })
}

/// Recover the public id from a delivery URL
pub fn public_id_from_url(url: &str) -> Option<String> {
    parse_delivery_url(url).map(|parsed| parsed.public_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_id_plain() {
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/demo/image/upload/v1712345678/vitrine/sunset.jpg"),
            Some("vitrine/sunset".to_string())
        );
    }

    #[test]
    fn test_public_id_with_transformations() {
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/demo/image/upload/c_fill,w_300,h_200/q_auto/vitrine/a/b.png"),
            Some("vitrine/a/b".to_string())
        );
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/demo/image/upload/c_fill,w_300/v42/sample.png?x=1"),
            Some("sample".to_string())
        );
    }

    #[test]
    fn test_public_id_video_kind() {
        let parsed = parse_delivery_url("https://res.cloudinary.com/demo/video/upload/v1/clips/intro.mp4").unwrap();
        assert_eq!(parsed.kind, AssetKind::Video);
        assert_eq!(parsed.public_id, "clips/intro");
    }

    #[test]
    fn test_public_id_rejects_foreign_urls() {
        assert_eq!(public_id_from_url("https://example.com/photos/cat.jpg"), None);
        assert_eq!(public_id_from_url("not a url"), None);
        assert_eq!(public_id_from_url("https://res.cloudinary.com/demo/image/upload/v12/"), None);
    }

    #[test]
    fn test_descriptor_from_foreign_url_keeps_url_identity() {
        let asset = AssetDescriptor::from_url("https://example.com/cat.jpg", AssetKind::Image);
        assert_eq!(asset.public_id, "https://example.com/cat.jpg");
        assert!(asset.is_image());
    }

    #[test]
    fn test_descriptor_identity_is_public_id() {
        let a = AssetDescriptor::from_url("https://res.cloudinary.com/d/image/upload/v1/x.jpg", AssetKind::Image);
        let b = AssetDescriptor::from_url("https://res.cloudinary.com/d/image/upload/w_10/v2/x.png", AssetKind::Image);
        assert_eq!(a, b);
    }

    #[test]
    fn test_kind_detection() {
        assert_eq!(AssetKind::from_mime("image/png"), Some(AssetKind::Image));
        assert_eq!(AssetKind::from_mime("video/mp4"), Some(AssetKind::Video));
        assert_eq!(AssetKind::from_mime("application/pdf"), None);
        assert_eq!(AssetKind::from_url("https://x.test/clip.MP4?dl=1"), AssetKind::Video);
        assert_eq!(AssetKind::from_url("https://x.test/photo"), AssetKind::Image);
    }

    #[test]
    fn test_filter_parsing_and_matching() {
        assert_eq!("images".parse::<AssetFilter>().unwrap(), AssetFilter::Image);
        assert_eq!("".parse::<AssetFilter>().unwrap(), AssetFilter::All);
        assert!("audio".parse::<AssetFilter>().is_err());
        assert!(AssetFilter::All.matches(AssetKind::Video));
        assert!(!AssetFilter::Image.matches(AssetKind::Video));
    }

    #[test]
    fn test_list_request_clamps_page_size() {
        assert_eq!(AssetListRequest::new(AssetFilter::All, 10_000).page_size(), MAX_LIST_RESULTS);
        assert_eq!(AssetListRequest::new(AssetFilter::All, 0).page_size(), 1);
    }

    #[test]
    fn test_create_asset_host_memory() {
        let mut config = AssetHostConfig::default();
        config.driver = AssetHostDriver::Memory;
        let host = create_asset_host(&config).unwrap();
        assert_eq!(host.name(), "memory");
    }

    #[test]
    fn test_create_asset_host_cloudinary_requires_credentials() {
        let config = AssetHostConfig::default();
        assert!(matches!(create_asset_host(&config), Err(AssetError::Config(_))));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn public_id_survives_delivery_url(
            folder in "[a-z][a-z0-9_-]{0,8}",
            name in "[a-zA-Z0-9][a-zA-Z0-9_-]{0,12}",
            version in 1u64..9_999_999_999,
            ext in prop::sample::select(vec!["jpg", "png", "webp"]),
        ) {
            let url = format!("https://res.cloudinary.com/demo/image/upload/v{}/{}/{}.{}", version, folder, name, ext);
            prop_assert_eq!(public_id_from_url(&url), Some(format!("{}/{}", folder, name)));
        }
    }
}
