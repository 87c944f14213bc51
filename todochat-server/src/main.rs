use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ri-utilizziamo le funzioni e strutture definite in lib.rs
use todochat_server::{build_sqlite_url, config::Config, connect_pool, routes, run_migrations, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("load configuration")?;

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Costruisci l'URL del database SQLite
    let db_url = build_sqlite_url(&config.database_url).context("build sqlite DATABASE_URL")?;
    info!(%db_url, "using database");
    let pool = connect_pool(&db_url, config.db_max_connections)
        .await
        .context("connect to sqlite")?;
    run_migrations(&pool).await.context("run migrations")?;

    // Stato condiviso: store SQLite + hub dei topic iniettati nel relay
    let state = Arc::new(AppState::with_sqlite(pool, config.broadcast_capacity));
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context("bind tcp listener")?;
    info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server shutdown")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        // senza segnale non possiamo fermarci in modo pulito: resta in ascolto
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
