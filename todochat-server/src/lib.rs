use anyhow::Context;
use axum::http::StatusCode;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod broadcast;
pub mod config;
pub mod controllers;
pub mod error;
pub mod relay;
pub mod routes;
pub mod store;

use crate::broadcast::TopicHub;
use crate::relay::RelayService;
use crate::store::SqliteMessageStore;

const MEMORY_URL: &str = "sqlite::memory:";

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub relay: RelayService,
    /// Topic hub shared by every websocket session; the relay publishes into it.
    pub hub: Arc<TopicHub>,
}

impl AppState {
    /// Wires the SQLite store and a fresh topic hub into a relay.
    pub fn with_sqlite(pool: SqlitePool, broadcast_capacity: usize) -> Self {
        let hub = Arc::new(TopicHub::new(broadcast_capacity));
        let store = Arc::new(SqliteMessageStore::new(pool.clone()));
        let relay = RelayService::new(store, hub.clone());
        Self { pool, relay, hub }
    }
}

// Dato un percorso di file, restituisce un URL SQLite valido. Crea le directory genitrici se non esistono.
pub fn sqlite_url_for_path(p: &Path) -> anyhow::Result<String> {
    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };
    if let Some(parent) = abs.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent dirs for {:?}", parent))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&abs)
        .with_context(|| format!("create/open sqlite file {:?}", abs))?;
    let s = abs.to_string_lossy().replace('\\', "/");
    // unix paths already start with '/', windows ones start with the drive letter
    if s.starts_with('/') {
        Ok(format!("sqlite://{}", s))
    } else {
        Ok(format!("sqlite:///{}", s))
    }
}

/// Normalizza il DATABASE_URL configurato in un URL SQLite utilizzabile.
/// `sqlite::memory:` passa invariato, tutto il resto è trattato come percorso di file.
pub fn build_sqlite_url(raw: &str) -> anyhow::Result<String> {
    if raw == MEMORY_URL {
        return Ok(raw.to_string());
    }
    // Rimuovi il prefisso "sqlite://" se presente, per ottenere il percorso del file.
    // "sqlite:///abs/path" conserva lo slash iniziale.
    let path_part = raw
        .strip_prefix("sqlite://")
        .or_else(|| raw.strip_prefix("sqlite:"))
        .unwrap_or(raw);
    sqlite_url_for_path(&PathBuf::from(path_part))
}

// Connect to the database and return a connection pool.
pub async fn connect_pool(db_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = if db_url == MEMORY_URL {
        // every connection to :memory: is a separate database, so keep exactly one alive
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };
    let pool = options
        .connect(db_url)
        .await
        .with_context(|| format!("connect to sqlite via {}", db_url))?;
    Ok(pool)
}

// Crea la tabella dei messaggi e l'indice per lista se non esistono.
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let stmts = [
        r#"
        CREATE TABLE IF NOT EXISTS chat_messages (
            id           TEXT PRIMARY KEY,
            todo_list_id TEXT NOT NULL,
            user_id      TEXT NOT NULL,
            username     TEXT,
            content      TEXT NOT NULL,
            created_at   TEXT NOT NULL
        );"#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_chat_messages_todo_list_id
            ON chat_messages (todo_list_id);"#,
    ];
    // applica ogni statement di migrazione
    for s in &stmts {
        sqlx::query(s)
            .execute(pool)
            .await
            .with_context(|| format!("apply migration: {}", &s[..s.len().min(60)].replace('\n', " ")))?;
    }
    Ok(())
}

/// Controlla lo stato di salute del database tentando di acquisire una connessione dal pool.
pub async fn health_with_pool(pool: &SqlitePool) -> StatusCode {
    match pool.acquire().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "health check failed to acquire a connection");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
