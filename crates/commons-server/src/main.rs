mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use commons_api::post_cache::PostCache;
use commons_api::{AppState, AppStateInner};
use commons_db::Database;
use commons_wiki::EntryStore;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "commons=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database and wiki storage
    let db = Database::open(&config.db_path)?;
    let wiki = EntryStore::new(config.wiki_dir.clone()).await?;

    let state: AppState = Arc::new(AppStateInner::new(
        db,
        wiki,
        config.jwt_secret,
        chrono::Duration::days(config.token_days),
        PostCache::new(
            chrono::Duration::seconds(config.post_cache_secs),
            config.post_cache_entries,
        ),
    ));

    let app = commons_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Commons server listening on {}", config.addr);
    info!(
        "Post cache window: {} seconds, at most {} posts",
        config.post_cache_secs, config.post_cache_entries
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
