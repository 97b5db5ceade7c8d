//! carelink: patient/clinician health-records portal.
//!
//! Main entry point for the HTTP server.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use carelink::adapters::sanitize::SanitizingMakeWriter;
use carelink::adapters::{MemoryStore, SqliteStore};
use carelink::config::{LogMode, PortalConfig, StorageBackend};
use carelink::http::{router, AppState};
use carelink::ports::RecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = PortalConfig::from_env().context("invalid configuration")?;

    let (writer, _guard) = match config.log_mode {
        LogMode::File => {
            if let Some(parent) = config.log_file.parent() {
                // Best-effort: a missing directory surfaces when the file is opened.
                let _ = std::fs::create_dir_all(parent);
            }

            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.log_file)
                .with_context(|| format!("cannot open log file {}", config.log_file.display()))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stdout => tracing_appender::non_blocking(std::io::stdout()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting carelink...");

    match config.storage {
        StorageBackend::Sqlite => {
            let store = SqliteStore::new(&config.db_path).with_context(|| {
                format!("cannot open database {}", config.db_path.display())
            })?;
            tracing::info!("Using SQLite storage at {}", config.db_path.display());
            serve(Arc::new(store), &config).await?;
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            serve(Arc::new(MemoryStore::new()), &config).await?;
        }
    }

    tracing::info!("carelink shutdown complete.");
    Ok(())
}

async fn serve<S: RecordStore + 'static>(store: Arc<S>, config: &PortalConfig) -> Result<()> {
    let app = router(Arc::new(AppState::new(store, config)));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
