//! Media dialog sessions
//!
//! A dialog is the server-held state of one open media picker: what it edits,
//! the asset browser and the pending selection. Sessions live in a moka cache
//! and expire after a period of inactivity. Each one sits behind its own
//! mutex, so requests against the same dialog run one at a time.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{AssetBrowser, MediaSelection};
use crate::assets::AssetFilter;
use crate::models::ProfileSlot;

/// Upper bound on concurrently open dialogs
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// The entity a dialog's selection is committed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogTarget {
    /// A new (`media_id` absent) or existing media item, optionally added to a gallery
    MediaItem {
        #[serde(default)]
        media_id: Option<i64>,
        #[serde(default)]
        gallery_id: Option<i64>,
    },
    /// An image slot on the caller's own profile
    ProfileSlot { slot: ProfileSlot },
    /// The images of a page section
    PageSection { section_id: i64 },
}

impl DialogTarget {
    /// Whether only admins may open a dialog for this target
    pub fn requires_admin(&self) -> bool {
        !matches!(self, DialogTarget::ProfileSlot { .. })
    }

    /// Filter the browser starts with
    pub fn default_filter(&self) -> AssetFilter {
        match self {
            DialogTarget::MediaItem { .. } => AssetFilter::All,
            DialogTarget::ProfileSlot { .. } | DialogTarget::PageSection { .. } => AssetFilter::Image,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaDialog {
    pub id: String,
    pub owner_id: i64,
    pub target: DialogTarget,
    pub browser: AssetBrowser,
    pub selection: MediaSelection,
    pub created_at: DateTime<Utc>,
}

impl MediaDialog {
    pub fn new(owner_id: i64, target: DialogTarget, page_size: u32) -> Self {
        let browser = AssetBrowser::new(target.default_filter(), page_size);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id,
            target,
            browser,
            selection: MediaSelection::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_selection(mut self, selection: MediaSelection) -> Self {
        self.selection = selection;
        self
    }
}

pub type SharedDialog = Arc<Mutex<MediaDialog>>;

/// Open dialogs keyed by id
#[derive(Clone)]
pub struct DialogStore {
    cache: Cache<String, SharedDialog>,
    ttl: Duration,
}

impl std::fmt::Debug for DialogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogStore")
            .field("entry_count", &self.cache.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl DialogStore {
    /// Dialogs expire after `ttl` without being touched
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_CAPACITY)
    }

    pub fn with_capacity(ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(ttl)
            .build();
        Self { cache, ttl }
    }

    pub async fn insert(&self, dialog: MediaDialog) -> SharedDialog {
        let id = dialog.id.clone();
        let shared = Arc::new(Mutex::new(dialog));
        self.cache.insert(id, shared.clone()).await;
        shared
    }

    pub async fn get(&self, id: &str) -> Option<SharedDialog> {
        self.cache.get(id).await
    }

    pub async fn remove(&self, id: &str) -> Option<SharedDialog> {
        self.cache.remove(id).await
    }

    /// Approximate number of open dialogs
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
