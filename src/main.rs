use battleship::{
    router,
    stats::{InMemoryStatsRepository, PostgresStatsRepository, StatsRepository},
    AppConfig, AppState, BackgroundTasks, ConnectionManager, InMemoryConnectionManager,
    InMemoryStateStore, StateStore,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "battleship=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting battleship match server");

    let config = AppConfig::from_env();

    let stats: Arc<dyn StatsRepository> = match &config.database_url {
        Some(url) => {
            let pool = sqlx::PgPool::connect(url).await?;
            info!("Recording player stats in Postgres");
            Arc::new(PostgresStatsRepository::new(pool))
        }
        None => {
            warn!("DB_URL not set, player stats are kept in memory");
            Arc::new(InMemoryStatsRepository::new())
        }
    };

    let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
    let connections: Arc<dyn ConnectionManager> =
        Arc::new(InMemoryConnectionManager::new(config.broadcast_timeout));

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config, store, stats, connections.clone());
    let tasks = BackgroundTasks::start(&app_state).await?;
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    tasks.abort();
    connections.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
