// sreminder - reminder recurrence engine
// Entry point: runs the scheduler until Ctrl-C

use anyhow::Context;
use sreminder::config::{DATA_DIR_ENV, DEFAULT_DATA_DIR};
use sreminder::services::NotificationEvent;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sreminder=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting sreminder");

    let data_dir = std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    let state = sreminder::app::setup(data_dir)
        .await
        .context("failed to initialize application")?;

    let mut events = state.notifications.subscribe();
    let presenter = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => present(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Notification presenter lagged, {} event(s) dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let scheduler = state.scheduler.clone();
    let handle = scheduler.clone().start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    tracing::info!("Shutdown requested");
    scheduler.cancel();
    handle.await.context("scheduler task panicked")?;
    presenter.abort();

    tracing::info!("sreminder stopped");
    Ok(())
}

fn present(event: &NotificationEvent) {
    println!(
        "[{}] {}: {}",
        event.trigger_time.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
        event.title,
        event.body
    );
}
