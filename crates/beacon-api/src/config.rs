use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use beacon_processing::DEFAULT_BATCH_TIMEOUT;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    /// Process-local store; data is lost on restart.
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreKind::Postgres),
            "memory" | "in-memory" => Ok(StoreKind::Memory),
            other => Err(anyhow!("unknown store kind '{other}' (expected postgres or memory)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub ingest_timeout: Duration,
    pub run_migrations: bool,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind_addr = var("BEACON_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BEACON_BIND_ADDR must be a socket address such as 0.0.0.0:3000")?;

        let store = match var("BEACON_STORE") {
            Some(value) => value.parse()?,
            None => StoreKind::Postgres,
        };

        let database_url = var("DATABASE_URL").or_else(|| var("BEACON_DATABASE_URL"));
        if store == StoreKind::Postgres && database_url.is_none() {
            bail!("DATABASE_URL (or BEACON_DATABASE_URL) must be set when BEACON_STORE=postgres");
        }

        let db_max_connections = match var("BEACON_DB_MAX_CONNECTIONS") {
            Some(value) => value
                .trim()
                .parse()
                .context("BEACON_DB_MAX_CONNECTIONS must be a positive integer")?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        let ingest_timeout = match var("BEACON_INGEST_TIMEOUT_SECS") {
            Some(value) => {
                let secs: u64 = value
                    .trim()
                    .parse()
                    .context("BEACON_INGEST_TIMEOUT_SECS must be a whole number of seconds")?;
                if secs == 0 {
                    bail!("BEACON_INGEST_TIMEOUT_SECS must be greater than zero");
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_BATCH_TIMEOUT,
        };

        let run_migrations = match var("BEACON_RUN_MIGRATIONS") {
            Some(value) => parse_flag(&value)
                .with_context(|| format!("BEACON_RUN_MIGRATIONS has invalid value '{value}'"))?,
            None => true,
        };

        Ok(Self {
            bind_addr,
            store,
            database_url,
            db_max_connections,
            ingest_timeout,
            run_migrations,
        })
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL (or BEACON_DATABASE_URL) must be set")
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("expected a boolean, got '{other}'")),
    }
}
