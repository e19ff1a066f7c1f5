//! Media item API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{DeleteReport, MediaDraft, MediaItem, MediaQuery, PagedResult};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_media))
        .route("/{id}", get(get_media))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_media))
        .route("/{id}", put(update_media))
        .route("/{id}", delete(delete_media))
}

#[derive(Serialize)]
struct MediaResponse {
    media: MediaItem,
}

/// GET /api/v1/media?type=&tag=&gallery_class=&page=&per_page=
async fn list_media(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<MediaQuery>,
) -> Result<Json<PagedResult<MediaItem>>, ApiError> {
    let result = state.media_service.list(&query, viewer.as_ref()).await?;
    Ok(Json(result))
}

/// GET /api/v1/media/{id}
async fn get_media(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<MediaResponse>, ApiError> {
    let media = state.media_service.get(id, viewer.as_ref()).await?;
    Ok(Json(MediaResponse { media }))
}

/// POST /api/v1/admin/media
async fn create_media(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(mut draft): Json<MediaDraft>,
) -> Result<impl IntoResponse, ApiError> {
    draft.id = None;
    let media = state.media_service.save(draft, &user).await?;
    Ok((StatusCode::CREATED, Json(MediaResponse { media })))
}

/// PUT /api/v1/admin/media/{id}
async fn update_media(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(mut draft): Json<MediaDraft>,
) -> Result<Json<MediaResponse>, ApiError> {
    draft.id = Some(id);
    let media = state.media_service.save(draft, &user).await?;
    Ok(Json(MediaResponse { media }))
}

/// DELETE /api/v1/admin/media/{id}
///
/// Reports which hosted assets were removed and which could not be.
async fn delete_media(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteReport>, ApiError> {
    let report = state.media_service.delete(id).await?;
    Ok(Json(report))
}
