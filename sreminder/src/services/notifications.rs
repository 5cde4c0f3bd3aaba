//! Notification dispatcher
//!
//! Turns a due reminder into exactly one [`NotificationEvent`] and hands it
//! to a [`NotificationSink`]. OS-level delivery lives behind the sink.

use crate::config::{
    DEFAULT_NOTIFICATION_TITLE, NOTIFICATION_CHANNEL_CAPACITY, NOTIFICATION_KEY_PREFIX,
    PLACEHOLDER_NOTIFICATION_BODY,
};
use crate::database::{Note, NoteStore, Reminder};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// One firing of one reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEvent {
    /// Stable per reminder, lets the OS layer replace rather than stack
    pub dedupe_key: String,
    pub reminder_id: String,
    pub note_id: String,
    pub title: String,
    pub body: String,
    /// The occurrence being announced
    pub trigger_time: DateTime<Utc>,
}

/// Receives notification events for delivery
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: NotificationEvent) -> Result<()>;
}

/// Sink that only writes events to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait::async_trait]
impl NotificationSink for TracingSink {
    async fn deliver(&self, event: NotificationEvent) -> Result<()> {
        tracing::info!(
            key = %event.dedupe_key,
            note = %event.note_id,
            "Notification: {} - {}",
            event.title,
            event.body
        );
        Ok(())
    }
}

/// Sink that fans events out to any number of subscribers
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<NotificationEvent>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NotificationSink for BroadcastSink {
    async fn deliver(&self, event: NotificationEvent) -> Result<()> {
        let key = event.dedupe_key.clone();
        self.tx
            .send(event)
            .map_err(|_| AppError::Notification(format!("no subscriber for {}", key)))?;
        Ok(())
    }
}

/// Builds and delivers notification events for due reminders
#[derive(Clone)]
pub struct NotificationDispatcher {
    notes: Arc<dyn NoteStore>,
    sink: Arc<dyn NotificationSink>,
}

impl NotificationDispatcher {
    pub fn new(notes: Arc<dyn NoteStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { notes, sink }
    }

    /// De-duplication key for a reminder
    pub fn dedupe_key(reminder_id: &str) -> String {
        format!("{}:{}", NOTIFICATION_KEY_PREFIX, reminder_id)
    }

    /// Look up the owning note. Store failures are logged and read as missing.
    pub async fn resolve_note(&self, reminder: &Reminder) -> Option<Note> {
        match self.notes.get_by_id(&reminder.note_id).await {
            Ok(Some(note)) => Some(note),
            Ok(None) => {
                tracing::warn!(
                    "Note {} for reminder {} not found, using placeholder",
                    reminder.note_id,
                    reminder.id
                );
                None
            }
            Err(e) => {
                tracing::error!("Failed to get note for reminder {}: {}", reminder.id, e);
                None
            }
        }
    }

    /// Event for `reminder`, with placeholder text where the note has none
    pub fn build_event(reminder: &Reminder, note: Option<&Note>) -> NotificationEvent {
        let title = note
            .map(|n| n.title.trim())
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_NOTIFICATION_TITLE)
            .to_string();

        let body = note
            .and_then(|n| n.content.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(PLACEHOLDER_NOTIFICATION_BODY)
            .to_string();

        NotificationEvent {
            dedupe_key: Self::dedupe_key(&reminder.id),
            reminder_id: reminder.id.clone(),
            note_id: reminder.note_id.clone(),
            title,
            body,
            trigger_time: reminder.trigger_time,
        }
    }

    /// Deliver the event for an already resolved note
    pub async fn deliver(&self, reminder: &Reminder, note: Option<&Note>) -> Result<NotificationEvent> {
        let event = Self::build_event(reminder, note);
        self.sink.deliver(event.clone()).await?;

        tracing::info!("Notification sent for reminder {}", reminder.id);
        Ok(event)
    }

    /// Resolve the note, then deliver one event
    pub async fn dispatch(&self, reminder: &Reminder) -> Result<NotificationEvent> {
        let note = self.resolve_note(reminder).await;
        self.deliver(reminder, note.as_ref()).await
    }
}
