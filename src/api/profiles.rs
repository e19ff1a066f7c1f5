//! Profile API endpoints
//!
//! Profiles are public to read; the signed-in user edits their own through
//! `/profiles/me`. Slot images are written by committing a media dialog.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Profile, ProfileSlot, UpdateProfileInput};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/{user_id}", get(get_profile))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/me", put(update_my_profile))
        .route("/me/slots/{slot}", delete(clear_slot))
}

#[derive(Serialize)]
struct ProfileResponse {
    profile: Profile,
}

/// GET /api/v1/profiles/{user_id}
async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.profile_service.get(user_id).await?;
    Ok(Json(ProfileResponse { profile }))
}

/// PUT /api/v1/profiles/me
async fn update_my_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(input): Json<UpdateProfileInput>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.profile_service.update(&user, user.id, input).await?;
    Ok(Json(ProfileResponse { profile }))
}

/// DELETE /api/v1/profiles/me/slots/{slot}
async fn clear_slot(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slot): Path<String>,
) -> Result<StatusCode, ApiError> {
    let slot: ProfileSlot = slot
        .parse()
        .map_err(|e: anyhow::Error| ApiError::validation_error(e.to_string()))?;
    state.profile_service.set_slot(&user, user.id, slot, None).await?;
    Ok(StatusCode::NO_CONTENT)
}
