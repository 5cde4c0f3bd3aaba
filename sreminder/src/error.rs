//! Error types for the reminder engine
//!
//! All errors use thiserror for structured error handling.
//! Store, settings and notification failures share one enum so the
//! scheduler can log them uniformly at its per-tick boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Reminder not found: {0}")]
    ReminderNotFound(String),

    #[error("Unknown repeat policy: {0}")]
    UnknownRepeatPolicy(String),

    #[error("Invalid anchor time '{0}', expected HH:mm")]
    InvalidAnchorTime(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Generic(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
