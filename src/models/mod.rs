//! Data models
//!
//! Database entities and the input/output types the services and API share.

mod comment;
mod gallery;
mod media;
mod page;
mod profile;
mod session;
mod user;

pub(crate) use gallery::double_option;

pub use comment::{gravatar_url, Comment, CommentStatus, CommentWithAuthor, CreateCommentInput};
pub use gallery::{CreateGalleryInput, GallerySet, GalleryWithCount, GalleryWithItems, UpdateGalleryInput};
pub use media::{normalize_tags, DeleteReport, ListParams, MediaDraft, MediaItem, MediaQuery, PagedResult};
pub use page::{
    CreatePageInput, CreateSectionInput, Page, PageSection, PageStatus, PageWithSections, SectionKind,
    UpdatePageInput, UpdateSectionInput,
};
pub use profile::{Profile, ProfileSlot, UpdateProfileInput, MEDIA_SLOT_COUNT};
pub use session::Session;
pub use user::{viewer_is_member, User, UserRole};
