//! Application configuration constants
//!
//! Central location for polling defaults, validation boundaries and the
//! fixed strings used when building notifications.

// ===== Scheduler Polling =====

/// Default poll period in seconds between two scheduler passes
pub const DEFAULT_POLL_PERIOD_SECS: u64 = 30;

/// Minimum poll period in seconds.
/// Shorter periods hammer the store for no gain in precision.
pub const MIN_POLL_PERIOD_SECS: u64 = 5;

/// Maximum poll period in seconds (1 hour).
/// Longer periods make reminders noticeably late.
pub const MAX_POLL_PERIOD_SECS: u64 = 3_600;

// ===== Notifications =====

/// Title used when the owning note has no title
pub const DEFAULT_NOTIFICATION_TITLE: &str = "Reminder";

/// Body used when the owning note is missing or has no content
pub const PLACEHOLDER_NOTIFICATION_BODY: &str = "It's time for your reminder!";

/// Prefix of the de-duplication key handed to the notification layer
pub const NOTIFICATION_KEY_PREFIX: &str = "reminder";

/// Capacity of the broadcast channel used by [`crate::services::BroadcastSink`]
pub const NOTIFICATION_CHANNEL_CAPACITY: usize = 64;

// ===== Reminder Anchors =====

/// Format of the stored anchor time-of-day
pub const ANCHOR_TIME_FORMAT: &str = "%H:%M";

// ===== Storage =====

/// Name of the SQLite database file inside the data directory
pub const DATABASE_FILE_NAME: &str = "sreminder.db";

/// Pool size for the application's SQLite connections
pub const DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Name of the settings file inside the data directory
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Environment variable overriding the data directory used by the binary
pub const DATA_DIR_ENV: &str = "SREMINDER_DATA_DIR";

/// Data directory used by the binary when [`DATA_DIR_ENV`] is unset
pub const DEFAULT_DATA_DIR: &str = "sreminder-data";
