//! API layer - HTTP handlers and routing
//!
//! Everything is served under `/api/v1`:
//! - Auth, media, galleries, profiles, comments and pages (public reads)
//! - Media dialogs, comments and the own profile (signed in)
//! - Asset host access, content management, moderation and users (admin)

pub mod assets;
pub mod auth;
pub mod comments;
pub mod common;
pub mod dialogs;
pub mod galleries;
pub mod media;
pub mod middleware;
pub mod pages;
pub mod profiles;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};

/// Multipart envelope allowance on top of the largest accepted file
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/admin/assets", assets::router())
        .nest("/admin/media", media::admin_router())
        .nest("/admin/galleries", galleries::admin_router())
        .nest("/admin/comments", comments::admin_router())
        .nest("/admin/pages", pages::admin_router())
        .nest("/admin/sections", pages::section_router())
        .nest("/admin/users", users::admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/dialogs", dialogs::router())
        .nest("/profiles", profiles::protected_router())
        .nest("/comments", comments::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes; a valid session still identifies the viewer
    let public_routes = Router::new()
        .nest("/auth", auth::public_router())
        .nest("/media", media::public_router())
        .nest("/galleries", galleries::public_router())
        .nest("/profiles", profiles::public_router())
        .nest("/comments", comments::public_router())
        .nest("/pages", pages::public_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ));

    public_routes.merge(protected_routes).merge(admin_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors_origin = state.config.server.cors_origin.as_str();
    let allow_origin = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            tracing::warn!("Invalid CORS origin {:?}, cross-origin requests disabled", cors_origin);
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    let upload = &state.config.upload;
    let body_limit = upload.max_image_size.max(upload.max_video_size) as usize + BODY_LIMIT_SLACK;

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
