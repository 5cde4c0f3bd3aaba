//! Reminders service
//!
//! User-facing reminder operations: creation with anchor fields derived from
//! the chosen trigger, manual completion, enable toggle and deletion.
//! Automatic firing lives in the scheduler.

use crate::calendar::format_lunar_date;
use crate::database::{
    format_anchor_time, CreateReminderRequest, NoteStatus, Reminder, RepeatPolicy, Repository,
};
use crate::error::{AppError, Result};
use crate::services::recurrence::{DisableReason, Outcome, RecurrenceResolver};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use uuid::Uuid;

/// Service for managing reminders
#[derive(Clone)]
pub struct RemindersService<Tz: TimeZone> {
    repo: Repository,
    resolver: RecurrenceResolver<Tz>,
}

impl<Tz: TimeZone> RemindersService<Tz> {
    pub fn new(repo: Repository, resolver: RecurrenceResolver<Tz>) -> Self {
        Self { repo, resolver }
    }

    /// Create a reminder for an existing note.
    ///
    /// Calendar policies get their anchor day and `HH:mm` time from the
    /// trigger as seen in the local calendar zone. Lunar policies store
    /// the lunar day, solar ones the day-of-month.
    pub async fn create_reminder(&self, req: CreateReminderRequest) -> Result<Reminder> {
        self.repo.get_note(&req.note_id).await?;

        tracing::info!(
            "Creating {} reminder for note {} at {}",
            req.repeat_policy,
            req.note_id,
            req.trigger_time
        );

        let policy = req.repeat_policy;
        let repeat_interval_seconds = match policy {
            RepeatPolicy::Interval => match req.repeat_interval_seconds {
                Some(seconds) if seconds > 0 => Some(seconds),
                other => {
                    return Err(AppError::Generic(format!(
                        "Interval reminders need a positive interval, got {:?}",
                        other
                    )))
                }
            },
            _ => None,
        };

        let (repeat_day, repeat_time) = if policy.is_calendar_anchored() {
            let local = req.trigger_time.with_timezone(self.resolver.time_zone());
            let day = if policy.is_lunar() {
                self.resolver
                    .lunar_calendar()
                    .solar_to_lunar(local.date_naive())
                    .day
            } else {
                local.day()
            };
            (
                i32::try_from(day).ok(),
                Some(format_anchor_time(local.time())),
            )
        } else {
            (None, None)
        };

        let now = Utc::now();
        let reminder = Reminder {
            id: Uuid::new_v4().to_string(),
            note_id: req.note_id,
            trigger_time: req.trigger_time,
            repeat_type: match policy {
                RepeatPolicy::None => None,
                other => Some(other.as_tag().to_string()),
            },
            repeat_interval_seconds,
            repeat_day,
            repeat_time,
            enabled: true,
            created_at: now,
            updated_at: now,
        };

        self.repo.create_reminder(&reminder).await
    }

    pub async fn get_reminder(&self, id: &str) -> Result<Reminder> {
        self.repo.get_reminder(id).await
    }

    /// List all reminders, newest trigger first
    pub async fn list_reminders(&self) -> Result<Vec<Reminder>> {
        self.repo.list_reminders().await
    }

    pub async fn list_for_note(&self, note_id: &str) -> Result<Vec<Reminder>> {
        self.repo.list_reminders_for_note(note_id).await
    }

    /// Enable or disable one reminder
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<Reminder> {
        tracing::info!(
            "{} reminder {}",
            if enabled { "Enabling" } else { "Disabling" },
            id
        );
        self.repo.set_reminder_enabled(id, enabled).await?;
        self.repo.get_reminder(id).await
    }

    pub async fn toggle(&self, id: &str) -> Result<Reminder> {
        let reminder = self.repo.get_reminder(id).await?;
        self.set_enabled(id, !reminder.enabled).await
    }

    /// Mark the current occurrence done without waiting for it to fire.
    ///
    /// Recurring reminders move to their next occurrence after
    /// `completed_at`; one-shot reminders are disabled and their note
    /// completed.
    pub async fn complete_reminder(
        &self,
        id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<Reminder> {
        let mut reminder = self.repo.get_reminder(id).await?;

        let note_interval = match reminder.policy() {
            Ok(policy) if policy.uses_note_interval() => self
                .repo
                .find_note(&reminder.note_id)
                .await?
                .map(|note| note.repeat_interval_minutes),
            _ => None,
        };

        match self
            .resolver
            .next_occurrence(&reminder, note_interval, completed_at)
        {
            Outcome::Reschedule(next) => {
                tracing::info!("Reminder {} completed, next at {}", id, next);
                reminder.trigger_time = next;
            }
            Outcome::Disable(reason) => {
                tracing::info!("Reminder {} completed and disabled ({:?})", id, reason);
                reminder.enabled = false;
                if reason == DisableReason::OneShot {
                    self.repo
                        .update_note_status(&reminder.note_id, NoteStatus::Completed)
                        .await?;
                }
            }
        }

        self.repo.update_reminder(&reminder).await?;
        self.repo.get_reminder(id).await
    }

    pub async fn delete_reminder(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting reminder: {}", id);
        self.repo.delete_reminder(id).await
    }

    /// Lunar date of the next trigger, for lunar reminders only
    pub fn lunar_label(&self, reminder: &Reminder) -> Option<String> {
        match reminder.policy() {
            Ok(policy) if policy.is_lunar() => {
                let local = reminder
                    .trigger_time
                    .with_timezone(self.resolver.time_zone());
                let lunar = self
                    .resolver
                    .lunar_calendar()
                    .solar_to_lunar(local.date_naive());
                Some(format_lunar_date(&lunar))
            }
            _ => None,
        }
    }
}
