//! Asset browser
//!
//! Paged, filterable view over the asset host. Pages are appended as the
//! user scrolls; an asset is never listed twice.

use serde::Serialize;

use crate::assets::{AssetDescriptor, AssetFilter, AssetHost, AssetListRequest, AssetResult};

#[derive(Debug, Clone, Serialize)]
pub struct AssetBrowser {
    filter: AssetFilter,
    query: Option<String>,
    page_size: u32,
    assets: Vec<AssetDescriptor>,
    next_cursor: Option<String>,
    exhausted: bool,
    error: Option<String>,
}

impl AssetBrowser {
    pub fn new(filter: AssetFilter, page_size: u32) -> Self {
        Self {
            filter,
            query: None,
            page_size,
            assets: Vec::new(),
            next_cursor: None,
            exhausted: false,
            error: None,
        }
    }

    pub fn filter(&self) -> AssetFilter {
        self.filter
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn assets(&self) -> &[AssetDescriptor] {
        &self.assets
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Inline error from the last failed load, cleared by the next success
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn contains(&self, public_id: &str) -> bool {
        self.assets.iter().any(|a| a.public_id == public_id)
    }

    pub fn find(&self, public_id: &str) -> Option<&AssetDescriptor> {
        self.assets.iter().find(|a| a.public_id == public_id)
    }

    /// Fetch the next page and append unseen assets.
    ///
    /// Returns how many assets were appended. Does nothing once the host has
    /// reported the last page. A failure leaves the loaded pages untouched and
    /// records the error text.
    pub async fn load_more(&mut self, host: &dyn AssetHost) -> AssetResult<usize> {
        if self.exhausted {
            return Ok(0);
        }

        let request = AssetListRequest {
            filter: self.filter,
            max_results: self.page_size,
            cursor: self.next_cursor.clone(),
            query: self.query.clone(),
        };

        let page = match host.list(&request).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Asset listing failed: {}", e);
                self.error = Some(e.to_string());
                return Err(e);
            }
        };

        let mut appended = 0;
        for asset in page.assets {
            if self.filter.matches(asset.kind) && !self.contains(&asset.public_id) {
                self.assets.push(asset);
                appended += 1;
            }
        }

        self.exhausted = page.next_cursor.is_none();
        self.next_cursor = page.next_cursor;
        self.error = None;

        tracing::debug!(
            "Loaded {} asset(s), {} total, exhausted: {}",
            appended,
            self.assets.len(),
            self.exhausted
        );
        Ok(appended)
    }

    /// Change filter or search query and start over from the first page
    pub fn set_filter(&mut self, filter: AssetFilter, query: Option<String>) {
        self.filter = filter;
        self.query = query.map(|q| q.trim().to_string()).filter(|q| !q.is_empty());
        self.assets.clear();
        self.next_cursor = None;
        self.exhausted = false;
        self.error = None;
    }

    /// Put a freshly uploaded asset at the front without refetching.
    ///
    /// Returns `false` when the asset is already listed or hidden by the filter.
    pub fn merge_uploaded(&mut self, asset: &AssetDescriptor) -> bool {
        if !self.filter.matches(asset.kind) || self.contains(&asset.public_id) {
            return false;
        }
        self.assets.insert(0, asset.clone());
        true
    }

    /// Drop an asset from the listing (after deletion on the host)
    pub fn remove(&mut self, public_id: &str) -> bool {
        let before = self.assets.len();
        self.assets.retain(|a| a.public_id != public_id);
        self.assets.len() < before
    }
}
