//! Comment service
//!
//! New comments wait for moderation unless an admin wrote them. Public
//! listings only ever show approved comments.

use crate::db::repositories::{CommentRepository, MediaRepository};
use crate::models::{
    viewer_is_member, Comment, CommentStatus, CommentWithAuthor, CreateCommentInput, ListParams, PagedResult, User,
};
use anyhow::Context;
use std::sync::Arc;

const MAX_COMMENT_LENGTH: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Comment not found: {0}")]
    NotFound(i64),

    #[error("Media item not found: {0}")]
    MediaNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service for posting and moderating comments
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    media_repo: Arc<dyn MediaRepository>,
}

impl CommentService {
    /// Create a new comment service
    pub fn new(repo: Arc<dyn CommentRepository>, media_repo: Arc<dyn MediaRepository>) -> Self {
        Self { repo, media_repo }
    }

    /// Post a comment.
    ///
    /// Content is trimmed and must be 1..=2000 characters. Admins' comments are
    /// approved at once; everyone else's wait for moderation.
    pub async fn create(&self, author: &User, input: CreateCommentInput) -> Result<Comment, CommentServiceError> {
        let content = input.content.trim();
        if content.is_empty() {
            return Err(CommentServiceError::ValidationError("Comment cannot be empty".to_string()));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(CommentServiceError::ValidationError(format!(
                "Comment must be at most {} characters",
                MAX_COMMENT_LENGTH
            )));
        }
        if let Some(media_id) = input.media_id {
            self.check_media_visible(media_id, Some(author)).await?;
        }

        let comment = self
            .repo
            .create(author.id, input.media_id, content, author.is_admin())
            .await
            .context("Failed to create comment")?;
        tracing::info!(
            comment_id = comment.id,
            media_id = ?comment.media_id,
            status = %comment.status(),
            "Created comment"
        );
        Ok(comment)
    }

    /// Approved comments, oldest first. `media_id` absent lists site-wide comments.
    pub async fn list(
        &self,
        media_id: Option<i64>,
        viewer: Option<&User>,
    ) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        if let Some(media_id) = media_id {
            self.check_media_visible(media_id, viewer).await?;
        }
        Ok(self.repo.list_approved(media_id).await?)
    }

    /// Comments for the moderation queue, optionally filtered by status
    pub async fn list_for_moderation(
        &self,
        status: Option<CommentStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<CommentWithAuthor>, CommentServiceError> {
        let (items, total) = self
            .repo
            .list_by_status(status, params.page as i64, params.limit())
            .await
            .context("Failed to list comments")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Approve a pending or flagged comment
    pub async fn approve(&self, id: i64) -> Result<Comment, CommentServiceError> {
        self.moderate(id, CommentStatus::Approved).await
    }

    /// Flag a comment, hiding it from public listings
    pub async fn flag(&self, id: i64) -> Result<Comment, CommentServiceError> {
        self.moderate(id, CommentStatus::Flagged).await
    }

    /// Admins may delete any comment, authors their own
    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), CommentServiceError> {
        let comment = self.get(id).await?;
        if !actor.can_edit(comment.author_id) {
            return Err(CommentServiceError::PermissionDenied(
                "You can only delete your own comments".to_string(),
            ));
        }
        self.repo.delete(id).await.context("Failed to delete comment")?;
        tracing::info!(comment_id = id, actor_id = actor.id, "Deleted comment");
        Ok(())
    }

    async fn moderate(&self, id: i64, status: CommentStatus) -> Result<Comment, CommentServiceError> {
        if !self.repo.set_status(id, status).await? {
            return Err(CommentServiceError::NotFound(id));
        }
        tracing::info!(comment_id = id, status = %status, "Moderated comment");
        self.get(id).await
    }

    async fn get(&self, id: i64) -> Result<Comment, CommentServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to load comment")?
            .ok_or(CommentServiceError::NotFound(id))
    }

    async fn check_media_visible(&self, media_id: i64, viewer: Option<&User>) -> Result<(), CommentServiceError> {
        let item = self
            .media_repo
            .get_by_id(media_id)
            .await
            .context("Failed to load media item")?
            .ok_or(CommentServiceError::MediaNotFound(media_id))?;
        if item.premium && !viewer_is_member(viewer) {
            return Err(CommentServiceError::PermissionDenied(
                "This item is available to members only".to_string(),
            ));
        }
        Ok(())
    }
}
