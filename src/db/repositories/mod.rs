//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod comment;
pub mod gallery;
pub mod media;
pub mod page;
pub mod profile;
pub mod section;
pub mod session;
pub mod user;

pub use comment::{CommentRepository, SqlxCommentRepository};
pub use gallery::{GalleryRepository, SqlxGalleryRepository};
pub use media::{MediaFilter, MediaRepository, SqlxMediaRepository};
pub use page::{PageRepository, SqlxPageRepository};
pub use profile::{ProfileRepository, SqlxProfileRepository};
pub use section::{SectionRepository, SqlxSectionRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
