//! In-memory store
//!
//! Implements both store traits over plain vectors. Used by tests and by
//! embedders that keep notes elsewhere.

use super::models::{Note, NoteStatus, Reminder};
use super::store::{NoteStore, ReminderStore};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct InMemoryStore {
    notes: Mutex<Vec<Note>>,
    reminders: Mutex<Vec<Reminder>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_note(&self, note: Note) {
        self.notes.lock().await.push(note);
    }

    pub async fn insert_reminder(&self, reminder: Reminder) {
        self.reminders.lock().await.push(reminder);
    }

    pub async fn note(&self, id: &str) -> Option<Note> {
        self.notes.lock().await.iter().find(|n| n.id == id).cloned()
    }

    pub async fn reminder(&self, id: &str) -> Option<Reminder> {
        self.reminders
            .lock()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Remove a note and every reminder pointing at it
    pub async fn delete_note(&self, id: &str) {
        self.notes.lock().await.retain(|n| n.id != id);
        self.reminders.lock().await.retain(|r| r.note_id != id);
    }

    async fn modify_reminder<F>(&self, id: &str, modify: F) -> Result<()>
    where
        F: FnOnce(&mut Reminder),
    {
        let mut reminders = self.reminders.lock().await;
        let reminder = reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::ReminderNotFound(id.to_string()))?;

        modify(reminder);
        reminder.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait::async_trait]
impl NoteStore for InMemoryStore {
    async fn get_by_id(&self, id: &str) -> Result<Option<Note>> {
        Ok(self.note(id).await)
    }

    async fn update_status(&self, id: &str, status: NoteStatus) -> Result<()> {
        let mut notes = self.notes.lock().await;
        let note = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| AppError::NoteNotFound(id.to_string()))?;

        note.status = status;
        note.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReminderStore for InMemoryStore {
    async fn get_all_enabled(&self) -> Result<Vec<Reminder>> {
        Ok(self
            .reminders
            .lock()
            .await
            .iter()
            .filter(|r| r.enabled)
            .cloned()
            .collect())
    }

    async fn update(&self, reminder: &Reminder) -> Result<()> {
        let updated = reminder.clone();
        self.modify_reminder(&reminder.id, move |stored| *stored = updated)
            .await
    }

    async fn update_trigger_instant(&self, id: &str, trigger_time: DateTime<Utc>) -> Result<()> {
        self.modify_reminder(id, |r| r.trigger_time = trigger_time)
            .await
    }

    async fn update_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        self.modify_reminder(id, |r| r.enabled = enabled).await
    }
}
