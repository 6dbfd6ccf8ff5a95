use anyhow::{Context, Result};
use shared::{get_pool, Config};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod routes;
mod store;
mod views;

use routes::{router, AppState};
use store::CandleStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Trustboard dashboard server...");

    let config = Config::from_env()?;
    let store = match &config.database_url {
        Some(url) => match get_pool(url).await {
            Ok(pool) => {
                info!("Connected to database");
                CandleStore::Database(pool)
            }
            Err(e) => {
                warn!("Database unavailable ({:#}), falling back to the transformed CSV", e);
                CandleStore::Csv(config.pipeline.transformed_path())
            }
        },
        None => CandleStore::Csv(config.pipeline.transformed_path()),
    };
    info!("Reading candles from {}", store.describe());

    let app = router(AppState {
        store: Arc::new(store),
    });

    let listener = tokio::net::TcpListener::bind(&config.api_bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.api_bind_addr))?;
    info!("Dashboard listening on http://{}", config.api_bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
