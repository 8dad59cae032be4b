use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use skillswap_core::events::NotificationSink;
use skillswap_core::memory::InMemoryStore;
use skillswap_core::services::Services;
use skillswap_events::{EventBus, EventPersistence};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skillswap_api::config::ServerConfig;
use skillswap_api::router::build_app_router;
use skillswap_api::state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skillswap_api=debug,skillswap_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    // --- Storage ---
    let (pool, repositories, persistence_handle) = match &config.database_url {
        Some(database_url) => {
            let pool = skillswap_db::create_pool(database_url).await?;
            tracing::info!("Database connection pool created");

            skillswap_db::health_check(&pool).await?;
            tracing::info!("Database health check passed");

            skillswap_db::run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");

            // Writes every lifecycle event to platform_events.
            let handle = tokio::spawn(EventPersistence::run(pool.clone(), event_bus.subscribe()));
            let repositories = skillswap_db::repositories::pg_repositories(&pool);
            (Some(pool), repositories, Some(handle))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            (None, InMemoryStore::new().repositories(), None)
        }
    };

    let sink: Arc<dyn NotificationSink> = event_bus.clone();
    let services = Services::new(repositories, sink);

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        services,
        event_bus: Arc::clone(&event_bus),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Dropping the last bus handle closes the channel and ends persistence.
    drop(event_bus);
    if let Some(handle) = persistence_handle {
        let drain = Duration::from_secs(config.shutdown_timeout_secs);
        if tokio::time::timeout(drain, handle).await.is_err() {
            tracing::warn!("Event persistence did not drain before the shutdown timeout");
        }
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
