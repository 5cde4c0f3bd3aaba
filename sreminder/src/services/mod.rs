//! Services module
//!
//! The reminder engine (recurrence resolver, scanner, notification
//! dispatcher, scheduler loop) and the services that coordinate between
//! callers and the repository.

pub mod notes;
pub mod notifications;
pub mod recurrence;
pub mod reminders;
pub mod scanner;
pub mod scheduler;
pub mod settings;

pub use notes::NotesService;
pub use notifications::{
    BroadcastSink, NotificationDispatcher, NotificationEvent, NotificationSink, TracingSink,
};
pub use recurrence::{DisableReason, Outcome, RecurrenceResolver};
pub use reminders::RemindersService;
pub use scanner::DueReminderScanner;
pub use scheduler::{
    Clock, ManualClock, PassReport, ReminderScheduler, SchedulerState, SystemClock,
};
pub use settings::{AppSettings, ReminderSettings, SettingsService};
