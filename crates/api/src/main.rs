use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sheetflow_api::config::ServerConfig;
use sheetflow_api::router::build_app_router;
use sheetflow_api::state::AppState;
use sheetflow_db::PgStore;
use sheetflow_events::{BusConfig, PgEventBus};
use sheetflow_pipeline::{
    CompletionHandler, LocalFileStorage, MemoryCache, PipelineConfig, ServiceContext,
};
use sheetflow_worker::CompletionConsumer;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sheetflow_api=debug,sheetflow_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    let pipeline_config = PipelineConfig::from_env().expect("Invalid pipeline configuration");
    let bus_config = BusConfig::from_env().expect("Invalid event bus configuration");
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = sheetflow_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    sheetflow_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    sheetflow_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Pipeline ---
    let bus = Arc::new(PgEventBus::new(pool.clone(), bus_config));
    let storage = Arc::new(LocalFileStorage::new(pipeline_config.upload_dir.clone()));
    let (ctx, invalidator) = ServiceContext::new(
        Arc::new(PgStore::new(pool.clone())),
        bus.clone(),
        storage,
        Arc::new(MemoryCache::new()),
        pipeline_config,
    );
    tokio::spawn(async move {
        match invalidator.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Cache invalidator stopped"),
            Err(e) => tracing::error!(error = %e, "Cache invalidator panicked"),
            Ok(Ok(())) => {}
        }
    });

    // --- Completion consumer ---
    let consumer_cancel = CancellationToken::new();
    let consumer_handle = if config.completion_consumer_enabled {
        let consumer = CompletionConsumer::new(bus, CompletionHandler::new(ctx.clone()));
        let cancel = consumer_cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = consumer.run(cancel).await {
                tracing::error!(error = %e, "Completion consumer halted");
                std::process::exit(1);
            }
        }))
    } else {
        tracing::info!("Completion consumer disabled in this process");
        None
    };

    // --- App state ---
    let state = AppState {
        ctx,
        pool: Some(pool),
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    consumer_cancel.cancel();
    if let Some(handle) = consumer_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        tracing::info!("Completion consumer stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
