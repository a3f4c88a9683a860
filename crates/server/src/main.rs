//! Player-progress daemon entry point.
//!
//! Composition root for the subsystem: resolves configuration from the
//! environment, opens the file-backed archive store, wires the in-process
//! key-value backend and the logging mail sender, and keeps the reward
//! scheduler running until ctrl-c.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use progress_service::{FileArchiveStore, LogMailSender, MemoryKv, Service, ServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    setup_logging()?;

    let config = ServiceConfig::from_env();
    let data_dir = config.data_dir_or_default();
    tracing::info!(data_dir = %data_dir.display(), "opening archive store");
    let store = Arc::new(FileArchiveStore::new(&data_dir)?);

    let service = Service::builder()
        .config(config)
        .store(store)
        .kv(Arc::new(MemoryKv::new()))
        .mail(Arc::new(LogMailSender))
        .build()
        .await?;

    tracing::info!("progressd running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    service.shutdown().await?;

    Ok(())
}

/// Setup logging to both stderr and a daily-rolled file.
fn setup_logging() -> Result<()> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "progressd.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    // Leak the guard to keep the background file writer alive
    std::mem::forget(guard);

    tracing::info!("logging to {}/progressd.log", log_dir.display());
    Ok(())
}

/// Platform-specific log directory.
///
/// - macOS: `~/Library/Caches/progressd/logs`
/// - Linux: `~/.cache/progressd/logs` (or `$XDG_CACHE_HOME/progressd/logs`)
/// - Windows: `%LOCALAPPDATA%\progressd\logs`
/// - Fallback: `/tmp/progressd/logs`
fn log_directory() -> std::path::PathBuf {
    directories::ProjectDirs::from("", "", "progressd")
        .map(|dirs| dirs.cache_dir().join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("/tmp/progressd/logs"))
}
