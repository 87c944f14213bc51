use anyhow::Context;
use std::net::SocketAddr;

const DEFAULT_DATABASE_URL: &str = "todochat.db";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_RUST_LOG: &str = "todochat_server=info,tower_http=info";
const DEFAULT_BROADCAST_CAPACITY: usize = 100;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Server configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// File path, `sqlite://` URL or `sqlite::memory:`
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// `EnvFilter` directives for tracing
    pub rust_log: String,
    /// Messages buffered per topic, and per websocket session, before a slow client loses some
    pub broadcast_capacity: usize,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, so tests don't touch the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind
            .parse()
            .with_context(|| format!("parse BIND_ADDR {:?}", bind))?;

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_RUST_LOG.to_string()),
            broadcast_capacity: lookup("BROADCAST_CAPACITY")
                .and_then(|v| v.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(DEFAULT_BROADCAST_CAPACITY),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .filter(|&n: &u32| n > 0)
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
        })
    }
}
