//! Comment API endpoints
//!
//! Public listing shows approved comments only. Moderation lives under
//! `/admin/comments`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{default_page, default_per_page};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{Comment, CommentStatus, CommentWithAuthor, CreateCommentInput, ListParams, PagedResult};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list_comments))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_comment))
        .route("/{id}", delete(delete_comment))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_for_moderation))
        .route("/{id}", delete(delete_comment))
        .route("/{id}/approve", put(approve_comment))
        .route("/{id}/flag", put(flag_comment))
}

#[derive(Debug, Deserialize)]
pub struct CommentsQuery {
    #[serde(default)]
    pub media_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ModerationQuery {
    #[serde(default)]
    pub status: Option<CommentStatus>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

#[derive(Serialize)]
struct CommentsResponse {
    comments: Vec<CommentWithAuthor>,
}

#[derive(Serialize)]
struct CommentResponse {
    comment: Comment,
}

/// GET /api/v1/comments?media_id=
async fn list_comments(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<CommentsQuery>,
) -> Result<Json<CommentsResponse>, ApiError> {
    let comments = state.comment_service.list(query.media_id, viewer.as_ref()).await?;
    Ok(Json(CommentsResponse { comments }))
}

/// POST /api/v1/comments
async fn create_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(input): Json<CreateCommentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.comment_service.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(CommentResponse { comment })))
}

/// DELETE /api/v1/comments/{id} (own comments) and /api/v1/admin/comments/{id}
async fn delete_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/comments?status=
async fn list_for_moderation(
    State(state): State<AppState>,
    Query(query): Query<ModerationQuery>,
) -> Result<Json<PagedResult<CommentWithAuthor>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    let result = state.comment_service.list_for_moderation(query.status, &params).await?;
    Ok(Json(result))
}

async fn approve_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state.comment_service.approve(id).await?;
    Ok(Json(CommentResponse { comment }))
}

async fn flag_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state.comment_service.flag(id).await?;
    Ok(Json(CommentResponse { comment }))
}
