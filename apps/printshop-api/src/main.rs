use axum_helpers::server::{create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::RetryConfig;
use media_store::MediaStore;
use std::time::Duration;
use tower_http::services::ServeDir;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(database = %config.mongodb.database, "Connecting to MongoDB");
    let db = database::connect_with_retry(&config.mongodb, RetryConfig::default()).await?;

    let media = MediaStore::open(config.media.clone()).await?;
    info!(upload_dir = %media.upload_dir().display(), "Media store ready");

    let state = AppState::new(config, db, media);
    api::init_indexes(&state).await?;

    if let Some(seed) = &state.config.admin {
        if api::users::seed_admin(&state, seed).await? {
            info!(email = %seed.email, "Bootstrap admin created");
        }
    }

    let router = create_router::<openapi::ApiDoc>(api::routes(&state))?;
    let mut app = router.merge(health_router(state.config.app));

    // Stored files are addressed by `MEDIA_BASE_URL`; serve them ourselves
    // unless that points at another host.
    let base_url = state.config.media.base_url.trim_end_matches('/');
    if base_url.starts_with('/') && base_url.len() > 1 {
        app = app.nest_service(base_url, ServeDir::new(state.media.upload_dir()));
    }

    info!("Starting print shop API (30s shutdown timeout)");
    let server = state.config.server.clone();
    create_production_app(app, &server, Duration::from_secs(30), async move {
        info!("Shutting down: releasing MongoDB pool");
        drop(state);
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {e}"))?;

    info!("Print shop API shutdown complete");
    Ok(())
}
