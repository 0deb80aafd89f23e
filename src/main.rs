//! Server binary: settings from env (and `.env`), resources from file or built-ins, then serve.

use resource_server::{
    app, apply_migrations, builtin_resources, load_from_path, resolve, AppState, MemoryStore, PgStore,
    Settings, StorageKind, Store,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("resource_server=info")),
        )
        .init();

    let settings = Settings::from_env()?;

    let configs = match &settings.resources_path {
        Some(path) => load_from_path(path).await?,
        None => builtin_resources(),
    };
    let registry = resolve(&configs)?;
    settings.login.check(&registry)?;
    tracing::info!(resources = registry.len(), "resources resolved");

    let store: Arc<dyn Store> = match settings.storage {
        StorageKind::Postgres => {
            let url = settings
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required for postgres storage")?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await?;
            if settings.auto_migrate {
                apply_migrations(&pool, &registry).await?;
            }
            Arc::new(PgStore::new(pool))
        }
        StorageKind::Memory => {
            tracing::info!("using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let bind_addr = settings.bind_addr.clone();
    let router = app(AppState::new(store, settings, registry));

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
