//! Media dialog API endpoints
//!
//! A dialog is opened for one target, edited through a series of requests and
//! finally committed or closed. Every endpoint returns the dialog state after
//! the operation so clients can re-render from it.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::read_upload_sources;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::assets::AssetFilter;
use crate::media::{DialogTarget, MediaDialog, SelectionSlot};
use crate::services::{CommitInput, Committed, UploadResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(open_dialog))
        .route("/{id}", get(get_dialog))
        .route("/{id}", delete(close_dialog))
        .route("/{id}/browse", post(browse))
        .route("/{id}/filter", put(set_filter))
        .route("/{id}/select", post(select))
        .route("/{id}/upload", post(upload))
        .route("/{id}/import", post(import))
        .route("/{id}/selection", delete(remove))
        .route("/{id}/cover", put(set_cover))
        .route("/{id}/order", put(reorder))
        .route("/{id}/commit", post(commit))
}

#[derive(Debug, Deserialize)]
pub struct OpenDialogRequest {
    pub target: DialogTarget,
    #[serde(default)]
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub filter: AssetFilter,
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssetRequest {
    pub public_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveQuery {
    pub public_id: String,
    /// Also delete the asset on the host
    #[serde(default)]
    pub delete: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Serialize)]
pub struct DialogResponse {
    pub dialog: MediaDialog,
}

#[derive(Debug, Serialize)]
pub struct SelectResponse {
    /// Where the asset landed; absent when it was already selected
    pub slot: Option<SelectionSlot>,
    pub dialog: MediaDialog,
}

/// POST /api/v1/dialogs
async fn open_dialog(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(input): Json<OpenDialogRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let dialog = state
        .dialog_service
        .open(&user, input.target, input.page_size)
        .await?;
    Ok((StatusCode::CREATED, Json(DialogResponse { dialog })))
}

/// GET /api/v1/dialogs/{id}
async fn get_dialog(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<DialogResponse>, ApiError> {
    let dialog = state.dialog_service.get(&user, &id).await?;
    Ok(Json(DialogResponse { dialog }))
}

/// DELETE /api/v1/dialogs/{id}
async fn close_dialog(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.dialog_service.close(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/dialogs/{id}/browse - load the next page of assets
async fn browse(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<DialogResponse>, ApiError> {
    let dialog = state.dialog_service.browse(&user, &id).await?;
    Ok(Json(DialogResponse { dialog }))
}

/// PUT /api/v1/dialogs/{id}/filter
async fn set_filter(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
    Json(input): Json<FilterRequest>,
) -> Result<Json<DialogResponse>, ApiError> {
    let dialog = state
        .dialog_service
        .set_filter(&user, &id, input.filter, input.query)
        .await?;
    Ok(Json(DialogResponse { dialog }))
}

/// POST /api/v1/dialogs/{id}/select
async fn select(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
    Json(input): Json<AssetRequest>,
) -> Result<Json<SelectResponse>, ApiError> {
    let (slot, dialog) = state.dialog_service.select(&user, &id, &input.public_id).await?;
    Ok(Json(SelectResponse { slot, dialog }))
}

/// POST /api/v1/dialogs/{id}/upload (multipart, one or more `file` fields)
async fn upload(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<UploadResult>, ApiError> {
    let sources = read_upload_sources(multipart).await?;
    let result = state.dialog_service.upload(&user, &id, sources).await?;
    Ok(Json(result))
}

/// POST /api/v1/dialogs/{id}/import
async fn import(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
    Json(input): Json<ImportRequest>,
) -> Result<Json<UploadResult>, ApiError> {
    let result = state.dialog_service.import(&user, &id, &input.url).await?;
    Ok(Json(result))
}

/// DELETE /api/v1/dialogs/{id}/selection?public_id=&delete=
async fn remove(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
    Query(query): Query<RemoveQuery>,
) -> Result<Json<DialogResponse>, ApiError> {
    let dialog = state
        .dialog_service
        .remove(&user, &id, &query.public_id, query.delete)
        .await?;
    Ok(Json(DialogResponse { dialog }))
}

/// PUT /api/v1/dialogs/{id}/cover
async fn set_cover(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
    Json(input): Json<AssetRequest>,
) -> Result<Json<DialogResponse>, ApiError> {
    let dialog = state.dialog_service.set_cover(&user, &id, &input.public_id).await?;
    Ok(Json(DialogResponse { dialog }))
}

/// PUT /api/v1/dialogs/{id}/order - move a supporting image
async fn reorder(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
    Json(input): Json<ReorderRequest>,
) -> Result<Json<DialogResponse>, ApiError> {
    let dialog = state
        .dialog_service
        .reorder(&user, &id, input.from, input.to)
        .await?;
    Ok(Json(DialogResponse { dialog }))
}

/// POST /api/v1/dialogs/{id}/commit
async fn commit(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
    body: Option<Json<CommitInput>>,
) -> Result<Json<Committed>, ApiError> {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let committed = state.dialog_service.commit(&user, &id, input).await?;
    Ok(Json(committed))
}
