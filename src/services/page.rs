//! Page builder service
//!
//! Pages are addressed by slug and hold an ordered list of sections. Section
//! bodies are Markdown, rendered to HTML on every write. Outside edit mode
//! only published pages and visible sections are returned.

use crate::db::repositories::{GalleryRepository, PageRepository, SectionRepository};
use crate::models::{
    CreatePageInput, CreateSectionInput, Page, PageSection, PageWithSections, UpdatePageInput,
    UpdateSectionInput,
};
use crate::services::MarkdownRenderer;
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

#[derive(Debug, thiserror::Error)]
pub enum PageServiceError {
    #[error("Page not found: {0}")]
    NotFound(String),

    #[error("Section not found: {0}")]
    SectionNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Page service for pages and their sections
pub struct PageService {
    repo: Arc<dyn PageRepository>,
    sections: Arc<dyn SectionRepository>,
    galleries: Arc<dyn GalleryRepository>,
    markdown: MarkdownRenderer,
}

impl PageService {
    /// Create a new page service
    pub fn new(
        repo: Arc<dyn PageRepository>,
        sections: Arc<dyn SectionRepository>,
        galleries: Arc<dyn GalleryRepository>,
    ) -> Self {
        Self {
            repo,
            sections,
            galleries,
            markdown: MarkdownRenderer::new(),
        }
    }

    /// Create a page; the slug is lowercased and must be unique
    pub async fn create(&self, input: CreatePageInput) -> Result<Page, PageServiceError> {
        let slug = validate_slug(&input.slug)?;
        let title = validate_title(&input.title)?;
        if self.repo.exists_by_slug(&slug).await? {
            return Err(PageServiceError::Conflict(format!("Page with slug '{}' already exists", slug)));
        }

        let page = Page::new(slug, title, input.status.unwrap_or_default());
        let created = self.repo.create(&page).await.context("Failed to create page")?;
        tracing::info!(page_id = created.id, slug = %created.slug, "Created page");
        Ok(created)
    }

    /// Update a page; a changed slug must still be unique
    pub async fn update(&self, id: i64, input: UpdatePageInput) -> Result<Page, PageServiceError> {
        let mut page = self.get_page(id).await?;

        if let Some(slug) = input.slug {
            let slug = validate_slug(&slug)?;
            if slug != page.slug && self.repo.exists_by_slug(&slug).await? {
                return Err(PageServiceError::Conflict(format!("Page with slug '{}' already exists", slug)));
            }
            page.slug = slug;
        }
        if let Some(title) = input.title {
            page.title = validate_title(&title)?;
        }
        if let Some(status) = input.status {
            page.status = status;
        }

        Ok(self.repo.update(&page).await.context("Failed to update page")?)
    }

    /// Delete a page and its sections
    pub async fn delete(&self, id: i64) -> Result<(), PageServiceError> {
        if !self.repo.delete(id).await? {
            return Err(PageServiceError::NotFound(id.to_string()));
        }
        tracing::info!(page_id = id, "Deleted page");
        Ok(())
    }

    /// Published pages, or every page in edit mode
    pub async fn list(&self, edit_mode: bool) -> Result<Vec<Page>, PageServiceError> {
        let pages = if edit_mode {
            self.repo.list().await?
        } else {
            self.repo.list_published().await?
        };
        Ok(pages)
    }

    /// Page with its sections.
    ///
    /// Outside edit mode drafts are not found and hidden sections are left out.
    pub async fn get_by_slug(&self, slug: &str, edit_mode: bool) -> Result<PageWithSections, PageServiceError> {
        let page = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to load page")?
            .filter(|p| edit_mode || p.is_published())
            .ok_or_else(|| PageServiceError::NotFound(slug.to_string()))?;

        let sections = self
            .sections
            .list_by_page(page.id, !edit_mode)
            .await
            .context("Failed to load sections")?;

        Ok(PageWithSections {
            page,
            sections,
            edit_mode,
        })
    }

    /// Append a section to the end of a page
    pub async fn add_section(&self, page_id: i64, input: CreateSectionInput) -> Result<PageSection, PageServiceError> {
        self.get_page(page_id).await?;
        if let Some(gallery_id) = input.gallery_id {
            self.check_gallery(gallery_id).await?;
        }

        let section = PageSection {
            id: 0,
            page_id,
            kind: input.kind,
            position: 0,
            heading: clean_heading(input.heading)?,
            body_html: self.markdown.render(&input.body),
            body: input.body,
            image_urls: clean_urls(input.image_urls),
            gallery_id: input.gallery_id,
            visible: input.visible,
            updated_at: chrono::Utc::now(),
        };
        let created = self.sections.create(&section).await.context("Failed to create section")?;
        tracing::info!(page_id, section_id = created.id, kind = %created.kind, "Added section");
        Ok(created)
    }

    /// Get a section by ID
    pub async fn get_section(&self, id: i64) -> Result<PageSection, PageServiceError> {
        self.sections
            .get_by_id(id)
            .await
            .context("Failed to load section")?
            .ok_or(PageServiceError::SectionNotFound(id))
    }

    /// Update a section; a new body is rendered again
    pub async fn update_section(&self, id: i64, input: UpdateSectionInput) -> Result<PageSection, PageServiceError> {
        let mut section = self.get_section(id).await?;

        if let Some(kind) = input.kind {
            section.kind = kind;
        }
        if let Some(heading) = input.heading {
            section.heading = clean_heading(heading)?;
        }
        if let Some(body) = input.body {
            section.body_html = self.markdown.render(&body);
            section.body = body;
        }
        if let Some(urls) = input.image_urls {
            section.image_urls = clean_urls(urls);
        }
        if let Some(gallery_id) = input.gallery_id {
            if let Some(gallery_id) = gallery_id {
                self.check_gallery(gallery_id).await?;
            }
            section.gallery_id = gallery_id;
        }
        if let Some(visible) = input.visible {
            section.visible = visible;
        }

        Ok(self.sections.update(&section).await.context("Failed to update section")?)
    }

    /// Delete a section
    pub async fn delete_section(&self, id: i64) -> Result<(), PageServiceError> {
        if !self.sections.delete(id).await? {
            return Err(PageServiceError::SectionNotFound(id));
        }
        Ok(())
    }

    /// Reorder a page's sections; `ordered_ids` must list each section once
    pub async fn reorder_sections(&self, page_id: i64, ordered_ids: &[i64]) -> Result<Vec<PageSection>, PageServiceError> {
        self.get_page(page_id).await?;
        let current: HashSet<i64> = self
            .sections
            .list_by_page(page_id, false)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        let requested: HashSet<i64> = ordered_ids.iter().copied().collect();
        if requested.len() != ordered_ids.len() || requested != current {
            return Err(PageServiceError::ValidationError(
                "Order must list every section of the page exactly once".to_string(),
            ));
        }

        self.sections.reorder(page_id, ordered_ids).await?;
        Ok(self.sections.list_by_page(page_id, false).await?)
    }

    /// Replace a section's images, in order
    pub async fn set_section_images(&self, id: i64, urls: Vec<String>) -> Result<PageSection, PageServiceError> {
        let urls = clean_urls(urls);
        if !self.sections.set_images(id, &urls).await? {
            return Err(PageServiceError::SectionNotFound(id));
        }
        tracing::info!(section_id = id, images = urls.len(), "Updated section images");
        self.get_section(id).await
    }

    async fn get_page(&self, id: i64) -> Result<Page, PageServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to load page")?
            .ok_or_else(|| PageServiceError::NotFound(id.to_string()))
    }

    async fn check_gallery(&self, gallery_id: i64) -> Result<(), PageServiceError> {
        if self.galleries.get_by_id(gallery_id).await?.is_none() {
            return Err(PageServiceError::ValidationError(format!(
                "Gallery {} does not exist",
                gallery_id
            )));
        }
        Ok(())
    }
}

fn validate_slug(slug: &str) -> Result<String, PageServiceError> {
    let slug = slug.trim().to_lowercase();
    if !SLUG_RE.is_match(&slug) || slug.len() > 200 {
        return Err(PageServiceError::ValidationError(
            "Slug must be lowercase letters, digits and single dashes".to_string(),
        ));
    }
    Ok(slug)
}

fn validate_title(title: &str) -> Result<String, PageServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PageServiceError::ValidationError("Title is required".to_string()));
    }
    if title.chars().count() > 255 {
        return Err(PageServiceError::ValidationError(
            "Title must be at most 255 characters".to_string(),
        ));
    }
    Ok(title.to_string())
}

fn clean_heading(heading: Option<String>) -> Result<Option<String>, PageServiceError> {
    let heading = heading.map(|h| h.trim().to_string()).filter(|h| !h.is_empty());
    if heading.as_ref().is_some_and(|h| h.chars().count() > 255) {
        return Err(PageServiceError::ValidationError(
            "Heading must be at most 255 characters".to_string(),
        ));
    }
    Ok(heading)
}

fn clean_urls(urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect()
}
