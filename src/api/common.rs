//! Common API utilities and shared types
//!
//! Service error conversions into `ApiError`, pagination query types and
//! multipart decoding shared by the upload endpoints.

use axum::extract::Multipart;
use serde::Deserialize;

use crate::api::middleware::ApiError;
use crate::assets::{AssetError, UploadSource};
use crate::media::{SelectionError, UploadError};
use crate::models::ListParams;
use crate::services::{
    CommentServiceError, DialogError, GalleryServiceError, MediaServiceError, PageServiceError, ProfileServiceError,
    UserServiceError,
};

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size
pub fn default_per_page() -> u32 {
    20
}

/// Basic pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl PaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

/// Log the cause and hide it from the client
fn internal(e: impl std::fmt::Display) -> ApiError {
    tracing::error!("Internal error: {}", e);
    ApiError::internal_error("Internal server error")
}

impl From<AssetError> for ApiError {
    fn from(e: AssetError) -> Self {
        match e {
            AssetError::Config(_) => internal(e),
            _ => ApiError::bad_gateway(e.to_string()),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Host(host) => host.into(),
            other => ApiError::validation_error(other.to_string()),
        }
    }
}

impl From<SelectionError> for ApiError {
    fn from(e: SelectionError) -> Self {
        match e {
            SelectionError::NotSelected(_) => ApiError::not_found(e.to_string()),
            _ => ApiError::validation_error(e.to_string()),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            UserServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<MediaServiceError> for ApiError {
    fn from(e: MediaServiceError) -> Self {
        match e {
            MediaServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            MediaServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            MediaServiceError::PermissionDenied(msg) => ApiError::forbidden(msg),
            MediaServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<GalleryServiceError> for ApiError {
    fn from(e: GalleryServiceError) -> Self {
        match e {
            GalleryServiceError::NotFound(_) | GalleryServiceError::MediaNotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            GalleryServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            GalleryServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<ProfileServiceError> for ApiError {
    fn from(e: ProfileServiceError) -> Self {
        match e {
            ProfileServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            ProfileServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ProfileServiceError::PermissionDenied(msg) => ApiError::forbidden(msg),
            ProfileServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(_) | CommentServiceError::MediaNotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            CommentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CommentServiceError::PermissionDenied(msg) => ApiError::forbidden(msg),
            CommentServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<PageServiceError> for ApiError {
    fn from(e: PageServiceError) -> Self {
        match e {
            PageServiceError::NotFound(_) | PageServiceError::SectionNotFound(_) => ApiError::not_found(e.to_string()),
            PageServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            PageServiceError::Conflict(msg) => ApiError::conflict(msg),
            PageServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<DialogError> for ApiError {
    fn from(e: DialogError) -> Self {
        match e {
            DialogError::NotFound(_) | DialogError::AssetNotFound(_) => ApiError::not_found(e.to_string()),
            DialogError::PermissionDenied(msg) => ApiError::forbidden(msg),
            DialogError::ValidationError(msg) => ApiError::validation_error(msg),
            DialogError::Selection(e) => e.into(),
            DialogError::Upload(e) => e.into(),
            DialogError::Host(e) => e.into(),
            DialogError::Media(e) => e.into(),
            DialogError::Gallery(e) => e.into(),
            DialogError::Profile(e) => e.into(),
            DialogError::Page(e) => e.into(),
        }
    }
}

/// Collect every `file` field of a multipart body as upload sources
pub async fn read_upload_sources(mut multipart: Multipart) -> Result<Vec<UploadSource>, ApiError> {
    let mut sources = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "file" && name != "files" {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

        sources.push(UploadSource::File {
            filename,
            content_type,
            data: data.to_vec(),
        });
    }

    if sources.is_empty() {
        return Err(ApiError::validation_error("No file provided"));
    }
    Ok(sources)
}
