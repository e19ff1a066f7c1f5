//! Asset host API endpoints (admin)
//!
//! Direct access to the asset host outside of a dialog: paged listing,
//! uploads, remote imports and deletion.

use axum::{
    extract::{Multipart, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::read_upload_sources;
use crate::api::middleware::{ApiError, AppState};
use crate::assets::{AssetFilter, AssetKind, AssetListRequest, AssetPage, UploadSource};
use crate::media::UploadReport;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assets))
        .route("/", delete(delete_asset))
        .route("/upload", post(upload_assets))
        .route("/import", post(import_asset))
}

#[derive(Debug, Deserialize)]
pub struct ListAssetsQuery {
    #[serde(default, rename = "type")]
    pub filter: AssetFilter,
    #[serde(default)]
    pub max_results: Option<u32>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAssetQuery {
    pub public_id: String,
    #[serde(default, rename = "type")]
    pub kind: AssetKind,
}

#[derive(Debug, Serialize)]
pub struct UploadsResponse {
    pub uploads: Vec<UploadReport>,
}

#[derive(Debug, Serialize)]
pub struct DeleteAssetResponse {
    pub public_id: String,
    /// `false` when the host did not know the asset
    pub deleted: bool,
}

/// GET /api/v1/admin/assets
async fn list_assets(
    State(state): State<AppState>,
    Query(query): Query<ListAssetsQuery>,
) -> Result<Json<AssetPage>, ApiError> {
    let request = AssetListRequest {
        filter: query.filter,
        max_results: query
            .max_results
            .unwrap_or(state.config.media_dialog.page_size)
            .min(state.config.media_dialog.max_page_size),
        cursor: query.cursor.filter(|c| !c.is_empty()),
        query: query.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
    };
    let page = state.asset_host.list(&request).await?;
    Ok(Json(page))
}

/// POST /api/v1/admin/assets/upload
///
/// Every file is reported on its own; the request fails only on a malformed body.
async fn upload_assets(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadsResponse>, ApiError> {
    let sources = read_upload_sources(multipart).await?;
    let outcomes = state
        .upload_pipeline
        .upload_many(state.asset_host.as_ref(), sources)
        .await;
    Ok(Json(UploadsResponse {
        uploads: outcomes.iter().map(UploadReport::from).collect(),
    }))
}

/// POST /api/v1/admin/assets/import
async fn import_asset(
    State(state): State<AppState>,
    Json(input): Json<ImportRequest>,
) -> Result<Json<crate::assets::AssetDescriptor>, ApiError> {
    let asset = state
        .upload_pipeline
        .upload(
            state.asset_host.as_ref(),
            UploadSource::RemoteUrl(input.url.trim().to_string()),
        )
        .await?;
    Ok(Json(asset))
}

/// DELETE /api/v1/admin/assets?public_id=&type=
async fn delete_asset(
    State(state): State<AppState>,
    Query(query): Query<DeleteAssetQuery>,
) -> Result<Json<DeleteAssetResponse>, ApiError> {
    if query.public_id.trim().is_empty() {
        return Err(ApiError::validation_error("public_id is required"));
    }
    let deleted = state.asset_host.delete(&query.public_id, query.kind).await?;
    tracing::info!(public_id = %query.public_id, deleted, "Deleted asset");
    Ok(Json(DeleteAssetResponse {
        public_id: query.public_id,
        deleted,
    }))
}
