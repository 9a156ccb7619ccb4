use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moviescout::{
    api::{create_router, AppState},
    config::{Config, StorageBackend},
    db::{create_redis_client, CacheStore, KeyValueStore, MemoryStore, RedisStore},
    services::{prompts::PromptBuilder, GeminiClient, GenerationClient, RefreshController},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("moviescout=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn KeyValueStore> = match config.storage {
        StorageBackend::Redis => {
            let client = create_redis_client(&config.redis_url)
                .with_context(|| format!("Invalid Redis URL {}", config.redis_url))?;
            Arc::new(RedisStore::new(client))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, caches will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    tracing::info!(backend = store.name(), namespace = %config.cache_namespace, "Storage ready");

    let gemini = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_api_url.clone());
    let controller = RefreshController::restore(
        GenerationClient::new(Arc::new(gemini)),
        PromptBuilder::new(config.gemini_model.clone()),
        CacheStore::new(store, config.cache_namespace.clone()),
    )
    .await
    .context("Failed to restore cached datasets")?;

    let app = create_router(AppState::new(controller));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(model = %config.gemini_model, "MovieScout listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
