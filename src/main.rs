use anyhow::{Context, Result};
use tokio::net::TcpListener;

use people_server::{config::Config, db_mongo, telemetry, AppState, PersonRepository};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let config = Config::from_env()?;

    let client = match db_mongo::create_client(&config).await {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("MongoDB connection error: {:#}", e);
            return Err(e);
        }
    };
    let db = db_mongo::get_database(&client, &config);
    tracing::info!(
        "Using database {} collection {}",
        db.name(),
        config.person_collection
    );

    let repo = PersonRepository::mongo(&db, &config.person_collection);
    let app = people_server::router(AppState::new(repo));

    let listener = TcpListener::bind(config.server_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.server_addr()))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    client.shutdown().await;
    tracing::info!("MongoDB connection closed");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
