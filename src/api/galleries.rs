//! Gallery API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, MaybeUser};
use crate::models::{CreateGalleryInput, GallerySet, GalleryWithCount, GalleryWithItems, UpdateGalleryInput};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_galleries))
        .route("/{id}", get(get_gallery))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_gallery))
        .route("/{id}", put(update_gallery))
        .route("/{id}", delete(delete_gallery))
        .route("/{id}/items", post(add_item))
        .route("/{id}/items/{media_id}", delete(remove_item))
        .route("/{id}/order", put(reorder_items))
}

#[derive(Serialize)]
struct GalleriesResponse {
    galleries: Vec<GalleryWithCount>,
}

#[derive(Serialize)]
struct GalleryResponse {
    gallery: GallerySet,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub media_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub media_ids: Vec<i64>,
}

#[derive(Serialize)]
struct AddItemResponse {
    /// `false` when the item already was a member
    added: bool,
}

async fn list_galleries(State(state): State<AppState>) -> Result<Json<GalleriesResponse>, ApiError> {
    let galleries = state.gallery_service.list().await?;
    Ok(Json(GalleriesResponse { galleries }))
}

async fn get_gallery(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<GalleryWithItems>, ApiError> {
    let gallery = state.gallery_service.get(id, viewer.as_ref()).await?;
    Ok(Json(gallery))
}

async fn create_gallery(
    State(state): State<AppState>,
    Json(input): Json<CreateGalleryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let gallery = state.gallery_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(GalleryResponse { gallery })))
}

async fn update_gallery(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateGalleryInput>,
) -> Result<Json<GalleryResponse>, ApiError> {
    let gallery = state.gallery_service.update(id, input).await?;
    Ok(Json(GalleryResponse { gallery }))
}

async fn delete_gallery(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.gallery_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<AddItemRequest>,
) -> Result<Json<AddItemResponse>, ApiError> {
    let added = state.gallery_service.add_item(id, input.media_id).await?;
    Ok(Json(AddItemResponse { added }))
}

async fn remove_item(
    State(state): State<AppState>,
    Path((id, media_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state.gallery_service.remove_item(id, media_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_items(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<OrderRequest>,
) -> Result<StatusCode, ApiError> {
    state.gallery_service.reorder(id, &input.media_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}
