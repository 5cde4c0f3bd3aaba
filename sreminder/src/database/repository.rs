//! Repository layer for database operations
//!
//! CRUD operations for notes and reminders, and the SQLite-backed
//! implementation of the engine's store traits.

use super::models::*;
use super::store::{NoteStore, ReminderStore};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new note
    pub async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (id, title, content, note_kind, status, repeat_interval_minutes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(req.note_kind)
        .bind(NoteStatus::Active)
        .bind(req.repeat_interval_minutes)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created note: {}", id);
        Ok(note)
    }

    /// Find a note by ID
    pub async fn find_note(&self, id: &str) -> Result<Option<Note>> {
        let note = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(note)
    }

    /// Get a note by ID
    pub async fn get_note(&self, id: &str) -> Result<Note> {
        self.find_note(id)
            .await?
            .ok_or_else(|| AppError::NoteNotFound(id.to_string()))
    }

    /// List notes of the given kinds, newest first
    pub async fn list_notes_by_kind(&self, kinds: &[NoteKind]) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>("SELECT * FROM notes ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(notes
            .into_iter()
            .filter(|note| kinds.contains(&note.note_kind))
            .collect())
    }

    /// Change a note's status
    pub async fn update_note_status(&self, id: &str, status: NoteStatus) -> Result<()> {
        let rows = sqlx::query("UPDATE notes SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NoteNotFound(id.to_string()));
        }

        tracing::debug!("Set note {} status to {:?}", id, status);
        Ok(())
    }

    /// Delete a note; its reminders go with it
    pub async fn delete_note(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NoteNotFound(id.to_string()));
        }

        tracing::debug!("Deleted note: {}", id);
        Ok(())
    }

    /// Insert a fully built reminder
    pub async fn create_reminder(&self, reminder: &Reminder) -> Result<Reminder> {
        let created = sqlx::query_as::<_, Reminder>(
            r#"
            INSERT INTO reminders (
                id, note_id, trigger_time, repeat_type, repeat_interval_seconds,
                repeat_day, repeat_time, enabled, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&reminder.id)
        .bind(&reminder.note_id)
        .bind(reminder.trigger_time)
        .bind(&reminder.repeat_type)
        .bind(reminder.repeat_interval_seconds)
        .bind(reminder.repeat_day)
        .bind(&reminder.repeat_time)
        .bind(reminder.enabled)
        .bind(reminder.created_at)
        .bind(reminder.updated_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(
            "Created reminder: {} for note: {}",
            created.id,
            created.note_id
        );
        Ok(created)
    }

    /// Get a reminder by ID
    pub async fn get_reminder(&self, id: &str) -> Result<Reminder> {
        sqlx::query_as::<_, Reminder>("SELECT * FROM reminders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::ReminderNotFound(id.to_string()))
    }

    /// List every reminder, latest trigger first
    pub async fn list_reminders(&self) -> Result<Vec<Reminder>> {
        let reminders =
            sqlx::query_as::<_, Reminder>("SELECT * FROM reminders ORDER BY trigger_time DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(reminders)
    }

    /// List reminders attached to a note
    pub async fn list_reminders_for_note(&self, note_id: &str) -> Result<Vec<Reminder>> {
        let reminders = sqlx::query_as::<_, Reminder>(
            "SELECT * FROM reminders WHERE note_id = ? ORDER BY trigger_time ASC",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reminders)
    }

    /// List enabled reminders, earliest trigger first
    pub async fn list_enabled_reminders(&self) -> Result<Vec<Reminder>> {
        let reminders = sqlx::query_as::<_, Reminder>(
            "SELECT * FROM reminders WHERE enabled = 1 ORDER BY trigger_time ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(reminders)
    }

    /// Overwrite a reminder's schedule fields
    pub async fn update_reminder(&self, reminder: &Reminder) -> Result<()> {
        let rows = sqlx::query(
            r#"
            UPDATE reminders
            SET trigger_time = ?, repeat_type = ?, repeat_interval_seconds = ?,
                repeat_day = ?, repeat_time = ?, enabled = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(reminder.trigger_time)
        .bind(&reminder.repeat_type)
        .bind(reminder.repeat_interval_seconds)
        .bind(reminder.repeat_day)
        .bind(&reminder.repeat_time)
        .bind(reminder.enabled)
        .bind(Utc::now())
        .bind(&reminder.id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::ReminderNotFound(reminder.id.clone()));
        }

        tracing::debug!("Updated reminder: {}", reminder.id);
        Ok(())
    }

    /// Move a reminder's next trigger
    pub async fn set_reminder_trigger(&self, id: &str, trigger_time: DateTime<Utc>) -> Result<()> {
        let rows =
            sqlx::query("UPDATE reminders SET trigger_time = ?, updated_at = ? WHERE id = ?")
                .bind(trigger_time)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        if rows == 0 {
            return Err(AppError::ReminderNotFound(id.to_string()));
        }

        tracing::debug!("Rescheduled reminder {} to {}", id, trigger_time);
        Ok(())
    }

    /// Enable or disable a reminder
    pub async fn set_reminder_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let rows = sqlx::query("UPDATE reminders SET enabled = ?, updated_at = ? WHERE id = ?")
            .bind(enabled)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::ReminderNotFound(id.to_string()));
        }

        tracing::debug!("Set reminder {} enabled={}", id, enabled);
        Ok(())
    }

    /// Delete a reminder
    pub async fn delete_reminder(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM reminders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::ReminderNotFound(id.to_string()));
        }

        tracing::debug!("Deleted reminder: {}", id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl NoteStore for Repository {
    async fn get_by_id(&self, id: &str) -> Result<Option<Note>> {
        self.find_note(id).await
    }

    async fn update_status(&self, id: &str, status: NoteStatus) -> Result<()> {
        self.update_note_status(id, status).await
    }
}

#[async_trait::async_trait]
impl ReminderStore for Repository {
    async fn get_all_enabled(&self) -> Result<Vec<Reminder>> {
        self.list_enabled_reminders().await
    }

    async fn update(&self, reminder: &Reminder) -> Result<()> {
        self.update_reminder(reminder).await
    }

    async fn update_trigger_instant(&self, id: &str, trigger_time: DateTime<Utc>) -> Result<()> {
        self.set_reminder_trigger(id, trigger_time).await
    }

    async fn update_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        self.set_reminder_enabled(id, enabled).await
    }
}
