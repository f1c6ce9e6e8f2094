//! Keywarden Server Binary
//!
//! Runs the key inventory HTTP server.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use keywarden_server::{create_router, AppState, InventoryStore, MemoryStore, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store = open_store(&config).await?;

    info!(
        port = config.port,
        status_threshold_hours = config.inventory.status_threshold_hours,
        activity_limit = config.inventory.activity_limit,
        "Starting Keywarden server"
    );

    let state = Arc::new(AppState::new(store, config.inventory.clone()));
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %addr, "Keywarden listening");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(feature = "postgres")]
async fn open_store(config: &ServerConfig) -> Result<Arc<dyn InventoryStore>, Box<dyn std::error::Error>> {
    match &config.database_url {
        Some(url) => {
            let store = keywarden_server::PostgresStore::new(url).await?;
            info!("Using PostgreSQL storage");
            Ok(Arc::new(store))
        }
        None => {
            info!("Using in-memory storage");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn open_store(config: &ServerConfig) -> Result<Arc<dyn InventoryStore>, Box<dyn std::error::Error>> {
    if config.database_url.is_some() {
        tracing::warn!("Database URL is set but this build lacks the `postgres` feature; using in-memory storage");
    } else {
        info!("Using in-memory storage");
    }
    Ok(Arc::new(MemoryStore::new()))
}
