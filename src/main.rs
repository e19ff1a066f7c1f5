//! Vitrine server

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitrine::{
    api::{self, AppState},
    assets::create_asset_host,
    config::Config,
    db,
    services::UserService,
};

const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// How often expired login sessions are purged
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitrine=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // `vitrine [config.yml]`, falling back to VITRINE_CONFIG
    let config_path: PathBuf = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("VITRINE_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
        .into();
    let config = Config::load_with_env(&config_path)?;
    tracing::info!(path = %config_path.display(), driver = ?config.asset_host.driver, "Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    pool.ping().await?;
    db::migrations::run_migrations(&pool).await?;
    tracing::info!(url = %config.database.url, "Database ready");

    let asset_host = create_asset_host(&config.asset_host)?;
    tracing::info!(host = asset_host.name(), folder = %config.asset_host.folder, "Asset host connected");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(pool, asset_host, config);
    spawn_session_cleanup(state.user_service.clone());

    let app = api::build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Vitrine listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn spawn_session_cleanup(user_service: std::sync::Arc<UserService>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = user_service.cleanup_expired_sessions().await {
                tracing::warn!(error = %e, "Session cleanup failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested, draining connections");
}
