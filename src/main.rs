use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use watchnext_api::{
    catalog::load_catalog,
    config::Config,
    db::{create_redis_client, Cache},
    routes::{create_router, AppState},
    services::providers::ImdbConnectionProvider,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let (basics, ratings) = (config.basics_path.clone(), config.ratings_path.clone());
    let catalog = tokio::task::spawn_blocking(move || load_catalog(&basics, &ratings))
        .await
        .context("Catalog loader task panicked")??;
    tracing::info!(titles = catalog.len(), "Catalog loaded");

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_handle) = Cache::new(redis_client);
    let provider = ImdbConnectionProvider::new(&config, cache)?;

    let state = Arc::new(AppState {
        catalog: Arc::new(catalog),
        provider: Arc::new(provider),
        resolve_timeout: config.resolve_timeout(),
    });
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    cache_handle.shutdown().await;
    Ok(())
}
