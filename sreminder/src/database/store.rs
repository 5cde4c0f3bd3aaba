//! Store traits consumed by the reminder engine
//!
//! The scheduler, scanner and dispatcher only see these traits, never a
//! concrete database.

use super::models::{Note, NoteStatus, Reminder};
use crate::error::Result;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait NoteStore: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<Option<Note>>;

    async fn update_status(&self, id: &str, status: NoteStatus) -> Result<()>;
}

#[async_trait::async_trait]
pub trait ReminderStore: Send + Sync {
    async fn get_all_enabled(&self) -> Result<Vec<Reminder>>;

    /// Overwrite every mutable field of a stored reminder
    async fn update(&self, reminder: &Reminder) -> Result<()>;

    async fn update_trigger_instant(&self, id: &str, trigger_time: DateTime<Utc>) -> Result<()>;

    async fn update_enabled(&self, id: &str, enabled: bool) -> Result<()>;
}
