//! Media dialog service
//!
//! Drives open dialogs: browsing the asset host, uploading, editing the
//! selection and finally committing it to the target entity. Every operation
//! locks the dialog's mutex for its whole duration, so requests against one
//! dialog are applied one after another.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;

use crate::assets::{AssetError, AssetFilter, AssetKind, DynAssetHost, UploadSource};
use crate::config::MediaDialogConfig;
use crate::media::{
    DialogStore, DialogTarget, MediaDialog, MediaSelection, SelectionError, SelectionSlot, UploadError,
    UploadOutcome, UploadPipeline, UploadReport,
};
use crate::models::{MediaDraft, MediaItem, PageSection, Profile, User};
use crate::services::{
    GalleryService, GalleryServiceError, MediaService, MediaServiceError, PageService, PageServiceError,
    ProfileService, ProfileServiceError,
};

#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    /// Unknown or expired dialog
    #[error("Dialog not found: {0}")]
    NotFound(String),

    #[error("Asset not found in dialog: {0}")]
    AssetNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Asset host error: {0}")]
    Host(#[from] AssetError),

    #[error(transparent)]
    Media(#[from] MediaServiceError),

    #[error(transparent)]
    Gallery(#[from] GalleryServiceError),

    #[error(transparent)]
    Profile(#[from] ProfileServiceError),

    #[error(transparent)]
    Page(#[from] PageServiceError),
}

/// Form fields saved alongside a media item selection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub premium: bool,
    #[serde(default)]
    pub gallery_class: Option<String>,
}

/// The entity a commit wrote
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "entity", rename_all = "snake_case")]
pub enum Committed {
    MediaItem(MediaItem),
    ProfileSlot(Profile),
    PageSection(PageSection),
}

/// Result of an upload or import: per-source reports and the dialog after
#[derive(Debug, Serialize)]
pub struct UploadResult {
    pub uploads: Vec<UploadReport>,
    pub dialog: MediaDialog,
}

/// Media dialog service: open sessions plus everything a commit writes to
pub struct DialogService {
    store: DialogStore,
    host: DynAssetHost,
    pipeline: UploadPipeline,
    media: Arc<MediaService>,
    galleries: Arc<GalleryService>,
    profiles: Arc<ProfileService>,
    pages: Arc<PageService>,
    config: MediaDialogConfig,
}

impl DialogService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: DialogStore,
        host: DynAssetHost,
        pipeline: UploadPipeline,
        media: Arc<MediaService>,
        galleries: Arc<GalleryService>,
        profiles: Arc<ProfileService>,
        pages: Arc<PageService>,
        config: MediaDialogConfig,
    ) -> Self {
        Self {
            store,
            host,
            pipeline,
            media,
            galleries,
            profiles,
            pages,
            config,
        }
    }

    /// Open a dialog for `target`, seeded from what the target already holds.
    ///
    /// The first page of assets is loaded right away; a host failure at this
    /// point is kept as the browser's error and does not fail the open.
    pub async fn open(
        &self,
        user: &User,
        target: DialogTarget,
        page_size: Option<u32>,
    ) -> Result<MediaDialog, DialogError> {
        if target.requires_admin() && !user.is_admin() {
            return Err(DialogError::PermissionDenied(
                "Only admins can edit this content".to_string(),
            ));
        }

        let selection = self.seed_selection(user, &target).await?;
        let page_size = page_size
            .unwrap_or(self.config.page_size)
            .clamp(1, self.config.max_page_size);

        let mut dialog = MediaDialog::new(user.id, target, page_size).with_selection(selection);
        if let Err(e) = dialog.browser.load_more(self.host.as_ref()).await {
            tracing::warn!(dialog_id = %dialog.id, error = %e, "Initial asset listing failed");
        }

        tracing::info!(dialog_id = %dialog.id, user_id = user.id, target = ?dialog.target, "Opened media dialog");
        let view = dialog.clone();
        self.store.insert(dialog).await;
        Ok(view)
    }

    /// Current state of one of the caller's dialogs
    pub async fn get(&self, user: &User, id: &str) -> Result<MediaDialog, DialogError> {
        let dialog = self.lock(user, id).await?;
        Ok(dialog.clone())
    }

    /// Load the next page of assets
    pub async fn browse(&self, user: &User, id: &str) -> Result<MediaDialog, DialogError> {
        let mut dialog = self.lock(user, id).await?;
        dialog.browser.load_more(self.host.as_ref()).await?;
        Ok(dialog.clone())
    }

    /// Switch filter or search query and load the first page again
    pub async fn set_filter(
        &self,
        user: &User,
        id: &str,
        filter: AssetFilter,
        query: Option<String>,
    ) -> Result<MediaDialog, DialogError> {
        let mut dialog = self.lock(user, id).await?;
        let filter = match (&dialog.target, filter) {
            (DialogTarget::MediaItem { .. }, filter) => filter,
            // Profile slots and sections only take images
            (_, AssetFilter::Video) => {
                return Err(DialogError::ValidationError(
                    "This target only accepts images".to_string(),
                ))
            }
            (_, _) => AssetFilter::Image,
        };
        dialog.browser.set_filter(filter, query);
        dialog.browser.load_more(self.host.as_ref()).await?;
        Ok(dialog.clone())
    }

    /// Add a listed asset to the selection
    pub async fn select(
        &self,
        user: &User,
        id: &str,
        public_id: &str,
    ) -> Result<(Option<SelectionSlot>, MediaDialog), DialogError> {
        let mut dialog = self.lock(user, id).await?;
        let asset = dialog
            .browser
            .find(public_id)
            .cloned()
            .ok_or_else(|| DialogError::AssetNotFound(public_id.to_string()))?;
        check_kind(&dialog.target, asset.kind)?;

        let slot = dialog.selection.select(asset);
        Ok((slot, dialog.clone()))
    }

    /// Upload files; each accepted upload joins the listing and the selection.
    ///
    /// Fails only when nothing was uploaded, with the first failure.
    pub async fn upload(&self, user: &User, id: &str, sources: Vec<UploadSource>) -> Result<UploadResult, DialogError> {
        let mut dialog = self.lock(user, id).await?;
        if sources.is_empty() {
            return Err(DialogError::ValidationError("No files to upload".to_string()));
        }

        let mut outcomes: Vec<UploadOutcome> = Vec::with_capacity(sources.len());
        let mut accepted = Vec::new();
        for source in sources {
            match check_kind(&dialog.target, source.kind()) {
                Ok(()) => accepted.push(source),
                Err(_) => outcomes.push(UploadOutcome {
                    source: source.label().to_string(),
                    result: Err(UploadError::UnsupportedType {
                        filename: source.label().to_string(),
                        content_type: source.kind().to_string(),
                    }),
                }),
            }
        }
        outcomes.extend(self.pipeline.upload_many(self.host.as_ref(), accepted).await);

        let mut uploaded = 0;
        let mut first_error = None;
        let mut reports = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            reports.push(UploadReport::from(&outcome));
            match outcome.result {
                Ok(asset) => {
                    dialog.browser.merge_uploaded(&asset);
                    dialog.selection.select(asset);
                    uploaded += 1;
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if uploaded == 0 {
            if let Some(e) = first_error {
                return Err(e.into());
            }
        }

        tracing::info!(dialog_id = %dialog.id, uploaded, total = reports.len(), "Dialog upload finished");
        Ok(UploadResult {
            uploads: reports,
            dialog: dialog.clone(),
        })
    }

    /// Have the host fetch a remote URL, then select it
    pub async fn import(&self, user: &User, id: &str, url: &str) -> Result<UploadResult, DialogError> {
        self.upload(user, id, vec![UploadSource::RemoteUrl(url.trim().to_string())])
            .await
    }

    /// Drop an asset from the selection, and from the host when `delete_from_host`.
    ///
    /// The host is asked first; if it fails nothing changes.
    pub async fn remove(
        &self,
        user: &User,
        id: &str,
        public_id: &str,
        delete_from_host: bool,
    ) -> Result<MediaDialog, DialogError> {
        let mut dialog = self.lock(user, id).await?;
        let kind = dialog
            .selection
            .assets()
            .into_iter()
            .chain(dialog.browser.find(public_id))
            .find(|a| a.public_id == public_id)
            .map(|a| a.kind);

        let Some(kind) = kind else {
            return Err(SelectionError::NotSelected(public_id.to_string()).into());
        };
        if !delete_from_host && !dialog.selection.contains(public_id) {
            return Err(SelectionError::NotSelected(public_id.to_string()).into());
        }

        if delete_from_host {
            let found = self.host.delete(public_id, kind).await?;
            dialog.browser.remove(public_id);
            tracing::info!(dialog_id = %dialog.id, public_id, found, "Deleted asset from host");
        }
        dialog.selection.remove(public_id);
        Ok(dialog.clone())
    }

    /// Promote a supporting image to cover
    pub async fn set_cover(&self, user: &User, id: &str, public_id: &str) -> Result<MediaDialog, DialogError> {
        let mut dialog = self.lock(user, id).await?;
        dialog.selection.set_cover(public_id)?;
        Ok(dialog.clone())
    }

    /// Move a supporting image
    pub async fn reorder(&self, user: &User, id: &str, from: usize, to: usize) -> Result<MediaDialog, DialogError> {
        let mut dialog = self.lock(user, id).await?;
        dialog.selection.reorder(from, to)?;
        Ok(dialog.clone())
    }

    /// Write the selection to the target and close the dialog.
    ///
    /// A selection without a cover image is rejected before anything is
    /// written, and the dialog stays open. A new media item's id is kept on
    /// the dialog as soon as it is inserted, so retrying after a failed
    /// gallery attach updates that row instead of inserting another.
    pub async fn commit(&self, user: &User, id: &str, input: CommitInput) -> Result<Committed, DialogError> {
        let mut dialog = self.lock(user, id).await?;
        let Some(cover) = dialog.selection.cover_url() else {
            return Err(DialogError::ValidationError("A cover image is required".to_string()));
        };

        let committed = match dialog.target.clone() {
            DialogTarget::MediaItem { media_id, gallery_id } => {
                let draft = MediaDraft {
                    id: media_id,
                    title: input.title,
                    description: input.description,
                    cover_image: Some(cover),
                    image_urls: dialog.selection.image_urls(),
                    video_url: dialog.selection.video_url(),
                    tags: input.tags,
                    premium: input.premium,
                    gallery_class: input.gallery_class,
                };
                let item = self.media.save(draft, user).await?;
                if media_id.is_none() {
                    dialog.target = DialogTarget::MediaItem {
                        media_id: Some(item.id),
                        gallery_id,
                    };
                }
                if let Some(gallery_id) = gallery_id {
                    self.galleries.add_item(gallery_id, item.id).await?;
                }
                Committed::MediaItem(item)
            }
            DialogTarget::ProfileSlot { slot } => {
                let profile = self.profiles.set_slot(user, user.id, slot, Some(cover)).await?;
                Committed::ProfileSlot(profile)
            }
            DialogTarget::PageSection { section_id } => {
                let section = self
                    .pages
                    .set_section_images(section_id, dialog.selection.urls())
                    .await?;
                Committed::PageSection(section)
            }
        };

        self.store.remove(&dialog.id).await;
        tracing::info!(dialog_id = %dialog.id, user_id = user.id, "Committed media dialog");
        Ok(committed)
    }

    /// Discard a dialog without saving
    pub async fn close(&self, user: &User, id: &str) -> Result<(), DialogError> {
        let dialog = self.lock(user, id).await?;
        self.store.remove(&dialog.id).await;
        Ok(())
    }

    /// Lock a dialog for the caller; the owner is checked after the lock is held
    async fn lock(&self, user: &User, id: &str) -> Result<OwnedMutexGuard<MediaDialog>, DialogError> {
        let shared = self
            .store
            .get(id)
            .await
            .ok_or_else(|| DialogError::NotFound(id.to_string()))?;
        let dialog = shared.lock_owned().await;
        if dialog.owner_id != user.id {
            return Err(DialogError::PermissionDenied(
                "This dialog belongs to another user".to_string(),
            ));
        }
        Ok(dialog)
    }

    async fn seed_selection(&self, user: &User, target: &DialogTarget) -> Result<MediaSelection, DialogError> {
        let selection = match target {
            DialogTarget::MediaItem { media_id, gallery_id } => {
                if let Some(gallery_id) = gallery_id {
                    self.galleries.get(*gallery_id, Some(user)).await?;
                }
                match media_id {
                    Some(id) => {
                        let item = self.media.get_any(*id).await?;
                        MediaSelection::from_urls(
                            Some(item.cover_image.as_str()),
                            &item.image_urls,
                            item.video_url.as_deref(),
                        )
                    }
                    None => MediaSelection::new(),
                }
            }
            DialogTarget::ProfileSlot { slot } => {
                let profile = self.profiles.get(user.id).await?;
                MediaSelection::from_urls(profile.slot(*slot), &[], None)
            }
            DialogTarget::PageSection { section_id } => {
                let section = self.pages.get_section(*section_id).await?;
                match section.image_urls.split_first() {
                    Some((first, rest)) => MediaSelection::from_urls(Some(first.as_str()), rest, None),
                    None => MediaSelection::new(),
                }
            }
        };
        Ok(selection)
    }
}

/// Profile slots and page sections hold images only
fn check_kind(target: &DialogTarget, kind: AssetKind) -> Result<(), DialogError> {
    if kind == AssetKind::Video && !matches!(target, DialogTarget::MediaItem { .. }) {
        return Err(DialogError::ValidationError(
            "This target only accepts images".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetHost, MemoryAssetHost};
    use crate::config::UploadConfig;
    use crate::db::repositories::{
        SqlxGalleryRepository, SqlxMediaRepository, SqlxPageRepository, SqlxProfileRepository,
        SqlxSectionRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{
        CreateGalleryInput, CreatePageInput, CreateSectionInput, MediaQuery, ProfileSlot, UserRole,
    };
    use std::time::Duration;

    struct Fixture {
        service: DialogService,
        host: Arc<MemoryAssetHost>,
        media: Arc<MediaService>,
        galleries: Arc<GalleryService>,
        pages: Arc<PageService>,
        profiles: Arc<ProfileService>,
        admin: User,
        visitor: User,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::boxed(pool.clone());
        let admin = users
            .create(&User::new("admin".into(), "a@x.test".into(), "h".into(), UserRole::Admin))
            .await
            .unwrap();
        let visitor = users
            .create(&User::new("vis".into(), "v@x.test".into(), "h".into(), UserRole::Visitor))
            .await
            .unwrap();

        let host = Arc::new(MemoryAssetHost::new("vitrine"));
        let media_repo = SqlxMediaRepository::boxed(pool.clone());
        let gallery_repo = SqlxGalleryRepository::boxed(pool.clone());
        let media = Arc::new(MediaService::new(media_repo.clone(), host.clone()));
        let galleries = Arc::new(GalleryService::new(gallery_repo.clone(), media_repo));
        let profiles = Arc::new(ProfileService::new(SqlxProfileRepository::boxed(pool.clone()), users));
        let pages = Arc::new(PageService::new(
            SqlxPageRepository::boxed(pool.clone()),
            SqlxSectionRepository::boxed(pool),
            gallery_repo,
        ));

        let service = DialogService::new(
            DialogStore::new(Duration::from_secs(60)),
            host.clone(),
            UploadPipeline::new(UploadConfig {
                max_image_size: 1024,
                ..UploadConfig::default()
            }),
            media.clone(),
            galleries.clone(),
            profiles.clone(),
            pages.clone(),
            MediaDialogConfig::default(),
        );

        Fixture {
            service,
            host,
            media,
            galleries,
            pages,
            profiles,
            admin,
            visitor,
        }
    }

    fn jpeg(name: &str, size: usize) -> UploadSource {
        UploadSource::File {
            filename: name.to_string(),
            content_type: "image/jpeg".to_string(),
            data: vec![1u8; size],
        }
    }

    fn new_item() -> DialogTarget {
        DialogTarget::MediaItem {
            media_id: None,
            gallery_id: None,
        }
    }

    #[tokio::test]
    async fn test_upload_appends_exactly_one_descriptor() {
        let f = setup().await;
        let dialog = f.service.open(&f.admin, new_item(), None).await.unwrap();

        let first = f.service.upload(&f.admin, &dialog.id, vec![jpeg("a.jpg", 10)]).await.unwrap();
        assert_eq!(first.dialog.selection.len(), 1);
        assert!(first.dialog.selection.cover().is_some());

        let second = f.service.upload(&f.admin, &dialog.id, vec![jpeg("b.jpg", 10)]).await.unwrap();
        assert_eq!(second.dialog.selection.len(), 2);
        assert_eq!(second.dialog.selection.supporting().len(), 1);
        assert_eq!(second.dialog.browser.assets().len(), 2);
    }

    #[tokio::test]
    async fn test_over_limit_upload_changes_nothing() {
        let f = setup().await;
        let dialog = f.service.open(&f.admin, new_item(), None).await.unwrap();

        let err = f
            .service
            .upload(&f.admin, &dialog.id, vec![jpeg("huge.jpg", 4096)])
            .await
            .unwrap_err();
        assert!(matches!(err, DialogError::Upload(UploadError::TooLarge { .. })));

        let after = f.service.get(&f.admin, &dialog.id).await.unwrap();
        assert!(after.selection.is_empty());
        assert!(f.host.is_empty().await);
    }

    #[tokio::test]
    async fn test_select_existing_asset() {
        let f = setup().await;
        let a = f.host.upload(jpeg("a.jpg", 10)).await.unwrap();
        let b = f.host.upload(jpeg("b.jpg", 10)).await.unwrap();
        let dialog = f.service.open(&f.admin, new_item(), None).await.unwrap();
        assert_eq!(dialog.browser.assets().len(), 2);

        let (slot, _) = f.service.select(&f.admin, &dialog.id, &a.public_id).await.unwrap();
        assert_eq!(slot, Some(SelectionSlot::Cover));
        let (slot, _) = f.service.select(&f.admin, &dialog.id, &b.public_id).await.unwrap();
        assert_eq!(slot, Some(SelectionSlot::Supporting(0)));
        let (slot, _) = f.service.select(&f.admin, &dialog.id, &b.public_id).await.unwrap();
        assert_eq!(slot, None);

        assert!(matches!(
            f.service.select(&f.admin, &dialog.id, "missing").await,
            Err(DialogError::AssetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_commit_without_cover_is_rejected() {
        let f = setup().await;
        let dialog = f.service.open(&f.admin, new_item(), None).await.unwrap();
        let input = CommitInput {
            title: "Empty".to_string(),
            ..CommitInput::default()
        };
        assert!(matches!(
            f.service.commit(&f.admin, &dialog.id, input).await,
            Err(DialogError::ValidationError(_))
        ));
        // still open
        assert!(f.service.get(&f.admin, &dialog.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_removed_asset_is_gone_after_save() {
        let f = setup().await;
        let dialog = f.service.open(&f.admin, new_item(), None).await.unwrap();
        let uploaded = f
            .service
            .upload(&f.admin, &dialog.id, vec![jpeg("a.jpg", 10), jpeg("b.jpg", 10)])
            .await
            .unwrap();
        assert_eq!(uploaded.uploads.len(), 2);

        let committed = f
            .service
            .commit(
                &f.admin,
                &dialog.id,
                CommitInput {
                    title: "Pair".to_string(),
                    ..CommitInput::default()
                },
            )
            .await
            .unwrap();
        let Committed::MediaItem(item) = committed else {
            panic!("expected a media item");
        };
        assert_eq!(item.image_urls.len(), 1);
        assert!(matches!(
            f.service.get(&f.admin, &dialog.id).await,
            Err(DialogError::NotFound(_))
        ));

        // Reopen on the saved item, drop the supporting image, save again
        let target = DialogTarget::MediaItem {
            media_id: Some(item.id),
            gallery_id: None,
        };
        let dialog = f.service.open(&f.admin, target, None).await.unwrap();
        assert_eq!(dialog.selection.len(), 2);
        let supporting = dialog.selection.supporting()[0].public_id.clone();

        let edited = f.service.remove(&f.admin, &dialog.id, &supporting, true).await.unwrap();
        assert_eq!(edited.selection.len(), 1);
        assert!(!f.host.contains(&supporting).await);

        f.service
            .commit(
                &f.admin,
                &dialog.id,
                CommitInput {
                    title: "Single".to_string(),
                    ..CommitInput::default()
                },
            )
            .await
            .unwrap();
        let saved = f.media.get_any(item.id).await.unwrap();
        assert!(saved.image_urls.is_empty());
        assert_eq!(saved.title, "Single");
    }

    #[tokio::test]
    async fn test_reopened_video_item_keeps_poster_cover() {
        let f = setup().await;
        let poster = "https://res.cloudinary.com/demo/video/upload/so_0/v1/vitrine/clip.jpg";
        let stream = "https://res.cloudinary.com/demo/video/upload/v1/vitrine/clip.mp4";
        let item = f
            .media
            .save(
                MediaDraft {
                    title: "Clip".to_string(),
                    cover_image: Some(poster.to_string()),
                    video_url: Some(stream.to_string()),
                    ..MediaDraft::default()
                },
                &f.admin,
            )
            .await
            .unwrap();

        let target = DialogTarget::MediaItem {
            media_id: Some(item.id),
            gallery_id: None,
        };
        let dialog = f.service.open(&f.admin, target, None).await.unwrap();
        assert_eq!(dialog.selection.cover_url().as_deref(), Some(poster));
        assert_eq!(dialog.selection.video_url().as_deref(), Some(stream));

        f.service
            .commit(
                &f.admin,
                &dialog.id,
                CommitInput {
                    title: "Clip, retitled".to_string(),
                    ..CommitInput::default()
                },
            )
            .await
            .unwrap();
        let saved = f.media.get_any(item.id).await.unwrap();
        assert_eq!(saved.cover_image, poster);
        assert_eq!(saved.video_url.as_deref(), Some(stream));
        assert!(saved.image_urls.is_empty());
    }

    #[tokio::test]
    async fn test_failed_gallery_attach_does_not_duplicate_item_on_retry() {
        let f = setup().await;
        let gallery = f
            .galleries
            .create(CreateGalleryInput {
                title: "Spring".to_string(),
                description: String::new(),
                classification: None,
            })
            .await
            .unwrap();
        let target = DialogTarget::MediaItem {
            media_id: None,
            gallery_id: Some(gallery.id),
        };
        let dialog = f.service.open(&f.admin, target, None).await.unwrap();
        f.service.upload(&f.admin, &dialog.id, vec![jpeg("a.jpg", 10)]).await.unwrap();

        f.galleries.delete(gallery.id).await.unwrap();
        let input = || CommitInput {
            title: "Blossom".to_string(),
            ..CommitInput::default()
        };
        for _ in 0..2 {
            assert!(matches!(
                f.service.commit(&f.admin, &dialog.id, input()).await,
                Err(DialogError::Gallery(GalleryServiceError::NotFound(_)))
            ));
        }

        let reopened = f.service.get(&f.admin, &dialog.id).await.unwrap();
        let DialogTarget::MediaItem {
            media_id: Some(media_id),
            ..
        } = reopened.target
        else {
            panic!("expected the inserted id on the dialog target");
        };
        let all = f.media.list(&MediaQuery::default(), Some(&f.admin)).await.unwrap();
        assert_eq!(all.total, 1);
        assert_eq!(all.items[0].id, media_id);
    }

    #[tokio::test]
    async fn test_host_failure_on_delete_keeps_selection() {
        let f = setup().await;
        let dialog = f.service.open(&f.admin, new_item(), None).await.unwrap();
        let result = f.service.upload(&f.admin, &dialog.id, vec![jpeg("a.jpg", 10)]).await.unwrap();
        let public_id = result.dialog.selection.cover().unwrap().public_id.clone();

        f.host.set_offline(true);
        assert!(matches!(
            f.service.remove(&f.admin, &dialog.id, &public_id, true).await,
            Err(DialogError::Host(_))
        ));
        let after = f.service.get(&f.admin, &dialog.id).await.unwrap();
        assert!(after.selection.contains(&public_id));
    }

    #[tokio::test]
    async fn test_permissions() {
        let f = setup().await;
        assert!(matches!(
            f.service.open(&f.visitor, new_item(), None).await,
            Err(DialogError::PermissionDenied(_))
        ));

        let target = DialogTarget::ProfileSlot {
            slot: ProfileSlot::Avatar,
        };
        let dialog = tokio_test::assert_ok!(f.service.open(&f.visitor, target, None).await);
        assert!(matches!(
            f.service.get(&f.admin, &dialog.id).await,
            Err(DialogError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_slot_commit() {
        let f = setup().await;
        let target = DialogTarget::ProfileSlot {
            slot: ProfileSlot::Banner,
        };
        let dialog = f.service.open(&f.visitor, target, None).await.unwrap();
        let clip = UploadSource::File {
            filename: "clip.mp4".to_string(),
            content_type: "video/mp4".to_string(),
            data: vec![1u8; 10],
        };
        assert!(f.service.upload(&f.visitor, &dialog.id, vec![clip]).await.is_err());

        f.service.upload(&f.visitor, &dialog.id, vec![jpeg("banner.jpg", 10)]).await.unwrap();
        f.service
            .commit(&f.visitor, &dialog.id, CommitInput::default())
            .await
            .unwrap();

        let profile = f.profiles.get(f.visitor.id).await.unwrap();
        assert!(profile.slot(ProfileSlot::Banner).is_some());
    }

    #[tokio::test]
    async fn test_page_section_commit_in_order() {
        let f = setup().await;
        let page = f
            .pages
            .create(CreatePageInput {
                slug: "home".to_string(),
                title: "Home".to_string(),
                status: None,
            })
            .await
            .unwrap();
        let section = f.pages.add_section(page.id, CreateSectionInput::default()).await.unwrap();

        let dialog = f
            .service
            .open(&f.admin, DialogTarget::PageSection { section_id: section.id }, None)
            .await
            .unwrap();
        f.service
            .upload(&f.admin, &dialog.id, vec![jpeg("1.jpg", 10), jpeg("2.jpg", 10), jpeg("3.jpg", 10)])
            .await
            .unwrap();
        let reordered = f.service.reorder(&f.admin, &dialog.id, 1, 0).await.unwrap();
        let expected = reordered.selection.urls();

        f.service.commit(&f.admin, &dialog.id, CommitInput::default()).await.unwrap();
        assert_eq!(f.pages.get_section(section.id).await.unwrap().image_urls, expected);
    }

    #[tokio::test]
    async fn test_open_survives_host_outage() {
        let f = setup().await;
        f.host.set_offline(true);
        let dialog = f.service.open(&f.admin, new_item(), None).await.unwrap();
        assert!(dialog.browser.error().is_some());
        assert!(matches!(
            f.service.browse(&f.admin, &dialog.id).await,
            Err(DialogError::Host(_))
        ));

        f.host.set_offline(false);
        f.service.browse(&f.admin, &dialog.id).await.unwrap();
        assert!(f.service.get(&f.admin, &dialog.id).await.unwrap().browser.error().is_none());
    }

    #[tokio::test]
    async fn test_close() {
        let f = setup().await;
        let dialog = f.service.open(&f.admin, new_item(), None).await.unwrap();
        tokio_test::assert_ok!(f.service.close(&f.admin, &dialog.id).await);
        assert!(matches!(
            f.service.close(&f.admin, &dialog.id).await,
            Err(DialogError::NotFound(_))
        ));
    }
}
