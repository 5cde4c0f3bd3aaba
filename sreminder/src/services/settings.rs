//! Settings service
//!
//! Persists application settings as JSON and publishes the reminder
//! settings to the scheduler through a watch channel.

use crate::config::{
    DEFAULT_POLL_PERIOD_SECS, MAX_POLL_PERIOD_SECS, MIN_POLL_PERIOD_SECS, SETTINGS_FILE_NAME,
};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::watch;

/// Reminder engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    /// Global switch; when off no reminder fires
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between two scheduler passes
    #[serde(default = "default_poll_period_secs")]
    pub poll_period_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_poll_period_secs() -> u64 {
    DEFAULT_POLL_PERIOD_SECS
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            poll_period_secs: default_poll_period_secs(),
        }
    }
}

impl ReminderSettings {
    /// Copy with the poll period clamped to the supported range
    pub fn normalized(self) -> Self {
        Self {
            poll_period_secs: self
                .poll_period_secs
                .clamp(MIN_POLL_PERIOD_SECS, MAX_POLL_PERIOD_SECS),
            ..self
        }
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(
            self.poll_period_secs
                .clamp(MIN_POLL_PERIOD_SECS, MAX_POLL_PERIOD_SECS),
        )
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppSettings {
    #[serde(default)]
    pub reminders: ReminderSettings,
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
    reminders_tx: Arc<watch::Sender<ReminderSettings>>,
}

impl SettingsService {
    pub fn new(app_data_dir: PathBuf) -> Self {
        let (tx, _) = watch::channel(ReminderSettings::default());
        Self {
            settings_path: app_data_dir.join(SETTINGS_FILE_NAME),
            reminders_tx: Arc::new(tx),
        }
    }

    /// Receiver that always holds the latest reminder settings
    pub fn subscribe(&self) -> watch::Receiver<ReminderSettings> {
        self.reminders_tx.subscribe()
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<AppSettings> {
        if !fs::try_exists(&self.settings_path).await? {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let mut settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Settings(format!("Failed to parse settings: {}", e)))?;
        settings.reminders = settings.reminders.normalized();

        self.publish(settings.reminders);
        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        let mut settings = settings.clone();
        settings.reminders = settings.reminders.normalized();

        let content = serde_json::to_string_pretty(&settings)?;
        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        self.publish(settings.reminders);
        Ok(())
    }

    /// Get reminder settings
    pub async fn get_reminders(&self) -> Result<ReminderSettings> {
        let settings = self.load().await?;
        Ok(settings.reminders)
    }

    /// Update reminder settings; the poll period is clamped before saving
    pub async fn update_reminders(&self, reminders: ReminderSettings) -> Result<ReminderSettings> {
        let mut settings = self.load().await?;
        settings.reminders = reminders.normalized();
        self.save(&settings).await?;
        Ok(settings.reminders)
    }

    /// Turn every reminder on or off
    pub async fn set_reminders_enabled(&self, enabled: bool) -> Result<ReminderSettings> {
        let current = self.get_reminders().await?;
        tracing::info!("Reminders globally {}", if enabled { "enabled" } else { "disabled" });
        self.update_reminders(ReminderSettings { enabled, ..current })
            .await
    }

    /// Flip the global reminder switch
    pub async fn toggle_reminders(&self) -> Result<ReminderSettings> {
        let current = self.get_reminders().await?;
        self.set_reminders_enabled(!current.enabled).await
    }

    fn publish(&self, reminders: ReminderSettings) {
        self.reminders_tx.send_if_modified(|current| {
            if *current == reminders {
                return false;
            }
            *current = reminders;
            true
        });
    }
}
