//! Pages API endpoints
//!
//! `?edit=true` asks for edit mode, which also returns drafts and hidden
//! sections. It is honoured for admins only; everyone else gets the public
//! view.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, MaybeUser};
use crate::models::{
    CreatePageInput, CreateSectionInput, Page, PageSection, PageWithSections, UpdatePageInput, UpdateSectionInput,
};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pages))
        .route("/{slug}", get(get_page_by_slug))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_page))
        .route("/{id}", put(update_page))
        .route("/{id}", delete(delete_page))
        .route("/{id}/sections", post(add_section))
        .route("/{id}/sections/order", put(reorder_sections))
}

pub fn section_router() -> Router<AppState> {
    Router::new()
        .route("/{id}", put(update_section))
        .route("/{id}", delete(delete_section))
}

#[derive(Debug, Default, Deserialize)]
pub struct EditQuery {
    #[serde(default)]
    pub edit: bool,
}

#[derive(Debug, Deserialize)]
pub struct SectionOrderRequest {
    pub section_ids: Vec<i64>,
}

#[derive(Serialize)]
struct PagesResponse {
    pages: Vec<Page>,
}

#[derive(Serialize)]
struct PageResponse {
    page: Page,
}

#[derive(Serialize)]
struct SectionResponse {
    section: PageSection,
}

#[derive(Serialize)]
struct SectionsResponse {
    sections: Vec<PageSection>,
}

/// GET /api/v1/pages?edit=
async fn list_pages(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<EditQuery>,
) -> Result<Json<PagesResponse>, ApiError> {
    let pages = state.page_service.list(query.edit && viewer.is_admin()).await?;
    Ok(Json(PagesResponse { pages }))
}

/// GET /api/v1/pages/{slug}?edit=
async fn get_page_by_slug(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
    Query(query): Query<EditQuery>,
) -> Result<Json<PageWithSections>, ApiError> {
    let page = state
        .page_service
        .get_by_slug(&slug, query.edit && viewer.is_admin())
        .await?;
    Ok(Json(page))
}

async fn create_page(
    State(state): State<AppState>,
    Json(input): Json<CreatePageInput>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.page_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(PageResponse { page })))
}

async fn update_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdatePageInput>,
) -> Result<Json<PageResponse>, ApiError> {
    let page = state.page_service.update(id, input).await?;
    Ok(Json(PageResponse { page }))
}

async fn delete_page(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.page_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_section(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CreateSectionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let section = state.page_service.add_section(id, input).await?;
    Ok((StatusCode::CREATED, Json(SectionResponse { section })))
}

async fn reorder_sections(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<SectionOrderRequest>,
) -> Result<Json<SectionsResponse>, ApiError> {
    let sections = state.page_service.reorder_sections(id, &input.section_ids).await?;
    Ok(Json(SectionsResponse { sections }))
}

async fn update_section(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateSectionInput>,
) -> Result<Json<SectionResponse>, ApiError> {
    let section = state.page_service.update_section(id, input).await?;
    Ok(Json(SectionResponse { section }))
}

async fn delete_section(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.page_service.delete_section(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
