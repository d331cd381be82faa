pub mod models;
pub mod store;

use anyhow::{Context, Result};
use mongodb::{options::ClientOptions, Client, Database};
use std::time::Duration;

use crate::config::Config;

pub use store::MongoPersonStore;

const APP_NAME: &str = "people-server";
const FALLBACK_DATABASE: &str = "test";

/// Create MongoDB connection
pub async fn create_client(config: &Config) -> Result<Client> {
    let mut options = ClientOptions::parse(config.mongo_uri.as_str())
        .await
        .context("Invalid MongoDB connection string")?;
    options.app_name = Some(APP_NAME.to_string());
    options.max_pool_size = Some(config.max_pool_size);
    options.server_selection_timeout =
        Some(Duration::from_secs(config.server_selection_timeout_secs));

    let client = Client::with_options(options).context("Failed to connect to MongoDB")?;

    // Ping to verify connection
    client
        .database("admin")
        .run_command(mongodb::bson::doc! {"ping": 1})
        .await
        .context("Failed to ping MongoDB")?;

    tracing::info!("Successfully connected to MongoDB");
    Ok(client)
}

/// Get database handle: explicit name, else the one in the URI, else `test`
pub fn get_database(client: &Client, config: &Config) -> Database {
    match &config.mongo_db_name {
        Some(name) => client.database(name),
        None => client
            .default_database()
            .unwrap_or_else(|| client.database(FALLBACK_DATABASE)),
    }
}
