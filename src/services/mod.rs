//! Services layer - Business logic
//!
//! Services validate input, enforce permissions and coordinate the
//! repositories and the asset host. Handlers only translate HTTP to service
//! calls and service errors to HTTP.

pub mod comment;
pub mod dialog;
pub mod gallery;
pub mod markdown;
pub mod media;
pub mod page;
pub mod password;
pub mod profile;
pub mod user;

pub use comment::{CommentService, CommentServiceError};
pub use dialog::{CommitInput, Committed, DialogError, DialogService, UploadResult};
pub use gallery::{GalleryService, GalleryServiceError};
pub use markdown::MarkdownRenderer;
pub use media::{MediaService, MediaServiceError};
pub use page::{PageService, PageServiceError};
pub use password::{hash_password, verify_password};
pub use profile::{ProfileService, ProfileServiceError};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
