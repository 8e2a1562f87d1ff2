use std::sync::Arc;

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

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheetflow_worker=debug,sheetflow_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pipeline_config = PipelineConfig::from_env().expect("Invalid pipeline configuration");
    let bus_config = BusConfig::from_env().expect("Invalid event bus configuration");

    let pool = sheetflow_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    sheetflow_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    sheetflow_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    let bus = Arc::new(PgEventBus::new(pool.clone(), bus_config));
    let storage = Arc::new(LocalFileStorage::new(pipeline_config.upload_dir.clone()));
    let (ctx, invalidator) = ServiceContext::new(
        Arc::new(PgStore::new(pool)),
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

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        shutdown.cancel();
    });

    let consumer = CompletionConsumer::new(bus, CompletionHandler::new(ctx));
    if let Err(e) = consumer.run(cancel).await {
        tracing::error!(error = %e, "Completion consumer halted");
        std::process::exit(1);
    }
    tracing::info!("Worker stopped");
}
