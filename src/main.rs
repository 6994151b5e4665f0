use crud_factory::{
    app_router, ensure_collection, ensure_database_exists, load_collections, resolve, Backend, DocumentStore,
    MemoryDatabase, PgStore, ResolvedModel, ServerConfig,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crud_factory=info,tower_http=info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let collections = load_collections(&config.config_path).await?;
    let model = resolve(&collections)?;
    let stores = open_stores(&config, &model).await?;
    tracing::info!(collections = stores.len(), "collections loaded");

    let app = app_router(stores, config.body_limit);
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn open_stores(
    config: &ServerConfig,
    model: &ResolvedModel,
) -> Result<Vec<Arc<dyn DocumentStore>>, Box<dyn std::error::Error>> {
    let mut stores: Vec<Arc<dyn DocumentStore>> = Vec::with_capacity(model.collections.len());
    match &config.backend {
        Backend::Memory => {
            tracing::info!("using in-memory store");
            let db = MemoryDatabase::new();
            for schema in &model.collections {
                stores.push(Arc::new(db.collection(schema.clone())));
            }
        }
        Backend::Postgres { url } => {
            ensure_database_exists(url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(url)
                .await?;
            for schema in &model.collections {
                ensure_collection(&pool, &config.data_schema, schema).await?;
                stores.push(Arc::new(PgStore::new(pool.clone(), &config.data_schema, schema.clone())));
            }
        }
    }
    Ok(stores)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
