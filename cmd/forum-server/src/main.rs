//! # Forum Server Binary
//!
//! The entry point that assembles the application from configuration and
//! compile-time features.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::{router, AppState};
use configs::{Backend, LogSettings, Settings};
use services::{Ports, Services};
use storage_adapters::MemoryStore;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    init_tracing(&settings.log);

    // 1. Storage backend
    let ports = build_ports(&settings).await?;

    // 2. Services and routes
    let services = Services::new(ports, settings.maintenance.reorganize_every);
    let app = router(AppState::new(services));

    // 3. Serve until ctrl-c
    let address = settings.server.address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(%address, backend = ?settings.database.backend, "forum server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("forum server stopped");
    Ok(())
}

/// `RUST_LOG` overrides the configured filter when set.
fn init_tracing(log: &LogSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn build_ports(settings: &Settings) -> anyhow::Result<Ports> {
    match settings.database.backend {
        Backend::Memory => {
            warn!("using the in-memory store; data is lost on shutdown");
            Ok(Ports::shared(Arc::new(MemoryStore::new())))
        }
        Backend::Postgres => postgres_ports(settings).await,
    }
}

#[cfg(feature = "db-postgres")]
async fn postgres_ports(settings: &Settings) -> anyhow::Result<Ports> {
    use storage_adapters::PgStore;

    let url = settings
        .database_url()
        .context("database.url is required for the postgres backend")?;
    let store = PgStore::connect(url, settings.database.max_connections)
        .await
        .context("failed to connect to postgres")?;
    if settings.database.run_migrations {
        store.migrate().await.context("failed to run migrations")?;
        info!("migrations applied");
    }
    Ok(Ports::shared(Arc::new(store)))
}

#[cfg(not(feature = "db-postgres"))]
async fn postgres_ports(_settings: &Settings) -> anyhow::Result<Ports> {
    anyhow::bail!("this build does not include postgres support (feature `db-postgres`)")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
