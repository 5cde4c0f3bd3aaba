//! Due-reminder scanner
//!
//! Finds enabled reminders whose trigger instant has arrived. A reminder
//! that is late by any amount is still due.

use crate::database::{Reminder, ReminderStore};
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct DueReminderScanner {
    reminders: Arc<dyn ReminderStore>,
}

impl DueReminderScanner {
    pub fn new(reminders: Arc<dyn ReminderStore>) -> Self {
        Self { reminders }
    }

    /// Due reminders at `now`; nothing when reminders are globally off
    pub async fn scan(&self, now: DateTime<Utc>, reminders_enabled: bool) -> Result<Vec<Reminder>> {
        if !reminders_enabled {
            tracing::debug!("Reminders globally disabled, skipping scan");
            return Ok(Vec::new());
        }

        let due: Vec<Reminder> = self
            .reminders
            .get_all_enabled()
            .await?
            .into_iter()
            .filter(|reminder| reminder.trigger_time <= now)
            .collect();

        tracing::debug!("Scan at {} found {} due reminder(s)", now, due.len());
        Ok(due)
    }
}
