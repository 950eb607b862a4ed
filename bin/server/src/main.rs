use duebell_core::SystemClock;
use duebell_server::{
    config::ServerConfig,
    services::{Collaborators, Services},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    let zone = config
        .scheduler
        .zone()
        .expect("SCHEDULER__TIMEZONE must be an IANA zone name");
    tracing::info!(timezone = %zone, "Loaded configuration");

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let services = Services::new(
        Collaborators::postgres(db_pool.clone(), Arc::new(SystemClock)),
        zone,
        &config.scheduler,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engines = services.spawn_engines(config.scheduler.runner(), &shutdown_rx);

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c; shutting down");
    }
    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);
    for result in futures::future::join_all(engines).await {
        if let Err(e) = result {
            tracing::warn!(error = %e, "engine task ended abnormally");
        }
    }
    db_pool.close().await;
}
