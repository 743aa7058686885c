use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::settings::AppConfig;
use crate::infrastructure::db::pool::{connect_to_db, run_migrations};
use crate::infrastructure::platforms::instagram::{InstagramClient, InstagramPublisher};
use crate::infrastructure::platforms::youtube::{YouTubeClient, YouTubePublisher};
use crate::infrastructure::platforms::{PublisherRegistry, http_client};
use crate::infrastructure::storage::s3::{MediaStorage, StorageService};
use crate::modules::content::model::Platform;
use crate::modules::content::repository::ContentRepository;
use crate::modules::credentials::repository::CredentialRepository;
use crate::modules::publish_job::repository::PublishJobRepository;
use crate::state::AppState;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod middleware;
mod modules;
mod routes;
mod state;
mod workers;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting server...");

    let config = match AppConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Missing required configuration: {}", e);
            return Err(e.into());
        }
    };

    let pool = connect_to_db(&config.database_url).await?;
    run_migrations(&pool).await?;

    let media: Arc<dyn MediaStorage> = Arc::new(
        StorageService::new(
            &config.minio_url,
            &config.minio_bucket,
            &config.minio_access_key,
            &config.minio_secret_key,
            &config.media_public_url,
        )
        .await,
    );

    let platforms = &config.platforms;
    let http = http_client(Duration::from_secs(platforms.http_timeout_secs))?;
    let upload_http = http_client(Duration::from_secs(platforms.upload_timeout_secs))?;

    let youtube = Arc::new(YouTubeClient::new(
        http.clone(),
        upload_http,
        &platforms.youtube_upload_url,
        &platforms.google_token_url,
        &platforms.google_client_id,
        &platforms.google_client_secret,
    ));
    let instagram = InstagramClient::new(http, &platforms.instagram_graph_url);

    let publishers = PublisherRegistry::new()
        .with(Platform::Instagram, Arc::new(InstagramPublisher::new(instagram, media.clone())))
        .with(Platform::Youtube, Arc::new(YouTubePublisher::new(youtube.clone(), media.clone())));

    let state = AppState::new(
        config.clone(),
        Arc::new(ContentRepository::new(pool.clone())),
        Arc::new(PublishJobRepository::new(pool.clone())),
        Arc::new(CredentialRepository::new(pool, youtube)),
        media,
        publishers,
    );

    workers::publisher::start_publish_worker(state.clone());

    let app = app::create_app(state).await;

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
