//! User administration endpoints (admin)

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{PagedResult, User, UserRole};

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/{id}/role", put(set_role))
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: UserRole,
}

#[derive(Serialize)]
struct UserResponse {
    user: User,
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<User>>, ApiError> {
    let users = state.user_service.list_users(&query.params()).await?;
    Ok(Json(users))
}

/// PUT /api/v1/admin/users/{id}/role - grant or revoke membership
async fn set_role(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<RoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if admin.id == id && input.role != UserRole::Admin {
        return Err(ApiError::validation_error("You cannot demote yourself"));
    }
    let user = state.user_service.set_role(id, input.role).await?;
    Ok(Json(UserResponse { user }))
}
