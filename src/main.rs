use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use curator_api::api::{create_router, AppState};
use curator_api::config::Config;
use curator_api::db::{
    create_pool, create_redis_client, Cache, CacheBackend, MemoryBackend, RedisBackend,
};
use curator_api::services::providers::{PgContentStore, PgInteractionStore, PgUserStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curator_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let backend: Arc<dyn CacheBackend> = match &config.redis_url {
        Some(redis_url) => {
            let client = create_redis_client(redis_url)?;
            Arc::new(RedisBackend::new(client))
        }
        None => {
            warn!("REDIS_URL not set, caching in process memory");
            Arc::new(MemoryBackend::new())
        }
    };
    let (cache, cache_writer) = Cache::new(backend).await;

    let state = AppState::new(
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgContentStore::new(pool.clone())),
        Arc::new(PgInteractionStore::new(pool)),
        cache,
    );

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Flush queued cache writes before the process exits.
    cache_writer.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
