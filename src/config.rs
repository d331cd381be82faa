use anyhow::{Context, Result};
use std::str::FromStr;

pub const DEFAULT_COLLECTION: &str = "people";

#[derive(Debug, Clone)]
pub struct Config {
    pub mongo_uri: String,
    /// Falls back to the database named in `mongo_uri`
    pub mongo_db_name: Option<String>,
    pub person_collection: String,
    pub max_pool_size: u32,
    pub server_selection_timeout_secs: u64,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mongo_uri = lookup("MONGO_URI")
            .filter(|uri| !uri.trim().is_empty())
            .context("MONGO_URI not set")?;

        Ok(Self {
            mongo_uri,
            mongo_db_name: lookup("MONGO_DB_NAME").filter(|name| !name.is_empty()),
            person_collection: lookup("PERSON_COLLECTION")
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            max_pool_size: parse_or(&lookup, "DB_MAX_POOL_SIZE", 20),
            server_selection_timeout_secs: parse_or(&lookup, "DB_SERVER_SELECTION_TIMEOUT_SECS", 10),
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            server_port: parse_or(&lookup, "SERVER_PORT", 3000),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
