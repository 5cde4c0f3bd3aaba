//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::config::DATABASE_FILE_NAME;
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::{
    BroadcastSink, NotesService, RecurrenceResolver, ReminderScheduler, RemindersService,
    SettingsService,
};
use chrono::{Local, TimeZone};
use std::path::PathBuf;
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState<Tz: TimeZone = Local> {
    pub app_data_dir: PathBuf,
    pub notes: NotesService,
    pub reminders: RemindersService<Tz>,
    pub settings: SettingsService,
    /// Every fired reminder is published here
    pub notifications: BroadcastSink,
    pub scheduler: Arc<ReminderScheduler<Tz>>,
}

/// Application setup in the machine's local time zone
pub async fn setup(app_data_dir: PathBuf) -> Result<AppState> {
    setup_in_zone(app_data_dir, Local).await
}

/// Application setup with an explicit calendar zone
pub async fn setup_in_zone<Tz>(app_data_dir: PathBuf, tz: Tz) -> Result<AppState<Tz>>
where
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    tracing::info!("Initializing application");
    tracing::info!("App data directory: {:?}", app_data_dir);

    tokio::fs::create_dir_all(&app_data_dir).await?;

    let pool = create_pool(&app_data_dir.join(DATABASE_FILE_NAME)).await?;
    let repo = Repository::new(pool);

    let settings = SettingsService::new(app_data_dir.clone());
    let reminder_settings = settings.get_reminders().await?;
    tracing::info!(
        "Reminders {}, polling every {}s",
        if reminder_settings.enabled { "enabled" } else { "disabled" },
        reminder_settings.poll_period_secs
    );

    let resolver = RecurrenceResolver::new(tz);
    let notifications = BroadcastSink::new();
    let store = Arc::new(repo.clone());
    let scheduler = ReminderScheduler::new(
        store.clone(),
        store,
        Arc::new(notifications.clone()),
        resolver.clone(),
        settings.subscribe(),
    );

    let state = AppState {
        app_data_dir,
        notes: NotesService::new(repo.clone()),
        reminders: RemindersService::new(repo, resolver),
        settings,
        notifications,
        scheduler: Arc::new(scheduler),
    };

    tracing::info!("Application initialized successfully");

    Ok(state)
}
