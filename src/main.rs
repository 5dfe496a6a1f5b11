use anyhow::Context;
use std::sync::Arc;

use workledger_api::config::{Config, StoreBackend};
use workledger_api::store::{EntryStore, JsonFileEntryStore, MemoryEntryStore, PgEntryStore};
use workledger_api::{db, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "workledger_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);
    let store = build_store(&config).await?;

    let state = AppState::new(store, config.clone());
    let app = routes::build_router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn EntryStore>> {
    let store: Arc<dyn EntryStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = db::create_pool(
                url,
                config.db_max_connections,
                config.db_acquire_timeout_secs,
            )
            .await
            .context("Failed to create database pool")?;

            let store = PgEntryStore::new(pool);
            store
                .migrate()
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");
            Arc::new(store)
        }
        StoreBackend::File => Arc::new(
            JsonFileEntryStore::open(&config.entry_file_path)
                .await
                .context("Failed to open entry file")?,
        ),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory entry store; entries are lost on restart");
            Arc::new(MemoryEntryStore::new())
        }
    };

    tracing::info!(backend = ?config.store_backend, "Entry store ready");
    Ok(store)
}
