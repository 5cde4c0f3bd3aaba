//! Notes service
//!
//! High-level business logic for notes operations.
//! Handles note lifecycle; deleting a note drops its reminders with it.

use crate::database::{CreateNoteRequest, Note, NoteKind, NoteStatus, Repository};
use crate::error::Result;

/// Service for managing notes
#[derive(Clone)]
pub struct NotesService {
    repo: Repository,
}

impl NotesService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create a new note
    pub async fn create_note(
        &self,
        title: String,
        content: Option<String>,
        note_kind: NoteKind,
        repeat_interval_minutes: i64,
    ) -> Result<Note> {
        tracing::info!("Creating new {:?} note: {}", note_kind, title);

        let req = CreateNoteRequest {
            title,
            content,
            note_kind,
            repeat_interval_minutes,
        };

        let note = self.repo.create_note(req).await?;

        tracing::info!("Note created successfully: {}", note.id);

        Ok(note)
    }

    /// Get a note by ID
    pub async fn get_note(&self, id: &str) -> Result<Note> {
        self.repo.get_note(id).await
    }

    /// List all notes
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        self.repo
            .list_notes_by_kind(&[
                NoteKind::Plain,
                NoteKind::OneShotReminder,
                NoteKind::RecurringReminder,
            ])
            .await
    }

    /// List notes that carry reminders
    pub async fn list_reminder_notes(&self) -> Result<Vec<Note>> {
        self.repo
            .list_notes_by_kind(&[NoteKind::OneShotReminder, NoteKind::RecurringReminder])
            .await
    }

    pub async fn mark_completed(&self, id: &str) -> Result<()> {
        tracing::info!("Completing note: {}", id);
        self.repo.update_note_status(id, NoteStatus::Completed).await
    }

    pub async fn reactivate(&self, id: &str) -> Result<()> {
        self.repo.update_note_status(id, NoteStatus::Active).await
    }

    /// Delete a note and its reminders
    pub async fn delete_note(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting note: {}", id);

        self.repo.delete_note(id).await?;

        tracing::info!("Note deleted successfully: {}", id);

        Ok(())
    }
}
