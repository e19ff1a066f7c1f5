//! Page builder models: pages and their ordered sections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Page status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Draft,
    Published,
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
        }
    }
}

impl std::str::FromStr for PageStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            _ => Err(anyhow::anyhow!("Invalid page status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub status: PageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    pub fn new(slug: String, title: String, status: PageStatus) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            slug,
            title,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == PageStatus::Published
    }
}

/// Kind of content block on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Hero,
    #[default]
    Text,
    Gallery,
    MediaGrid,
    Video,
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hero => write!(f, "hero"),
            Self::Text => write!(f, "text"),
            Self::Gallery => write!(f, "gallery"),
            Self::MediaGrid => write!(f, "media_grid"),
            Self::Video => write!(f, "video"),
        }
    }
}

impl std::str::FromStr for SectionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hero" => Ok(Self::Hero),
            "text" => Ok(Self::Text),
            "gallery" => Ok(Self::Gallery),
            "media_grid" => Ok(Self::MediaGrid),
            "video" => Ok(Self::Video),
            _ => Err(anyhow::anyhow!("Invalid section kind: {}", s)),
        }
    }
}

/// One content block of a page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSection {
    pub id: i64,
    pub page_id: i64,
    pub kind: SectionKind,
    pub position: i64,
    pub heading: Option<String>,
    /// Markdown source
    pub body: String,
    pub body_html: String,
    pub image_urls: Vec<String>,
    pub gallery_id: Option<i64>,
    pub visible: bool,
    pub updated_at: DateTime<Utc>,
}

/// Page with its sections in position order
#[derive(Debug, Clone, Serialize)]
pub struct PageWithSections {
    #[serde(flatten)]
    pub page: Page,
    pub sections: Vec<PageSection>,
    /// Set when drafts and hidden sections are included
    pub edit_mode: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePageInput {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub status: Option<PageStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePageInput {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub status: Option<PageStatus>,
}

/// New section; omitted fields take the values of `Default`, so a section
/// is visible unless asked otherwise
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CreateSectionInput {
    pub kind: SectionKind,
    pub heading: Option<String>,
    pub body: String,
    pub image_urls: Vec<String>,
    pub gallery_id: Option<i64>,
    pub visible: bool,
}

impl Default for CreateSectionInput {
    fn default() -> Self {
        Self {
            kind: SectionKind::default(),
            heading: None,
            body: String::new(),
            image_urls: Vec::new(),
            gallery_id: None,
            visible: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSectionInput {
    pub kind: Option<SectionKind>,
    #[serde(default, with = "super::double_option")]
    pub heading: Option<Option<String>>,
    pub body: Option<String>,
    pub image_urls: Option<Vec<String>>,
    #[serde(default, with = "super::double_option")]
    pub gallery_id: Option<Option<i64>>,
    pub visible: Option<bool>,
}
