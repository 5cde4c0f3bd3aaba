//! Reminder scheduler
//!
//! Background polling loop. Every tick it reads the reminder settings once,
//! scans for due reminders, and for each one dispatches a notification,
//! resolves the next occurrence and persists the outcome. Passes never
//! overlap, and one reminder's failure never blocks the others.

use crate::database::{NoteStatus, NoteStore, Reminder, ReminderStore};
use crate::error::Result;
use crate::services::notifications::{NotificationDispatcher, NotificationSink};
use crate::services::recurrence::{DisableReason, Outcome, RecurrenceResolver};
use crate::services::scanner::DueReminderScanner;
use crate::services::settings::ReminderSettings;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scanning,
}

/// Counters for one scan pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Reminders found due by the scan
    pub due: usize,
    /// Notifications delivered
    pub fired: usize,
    pub rescheduled: usize,
    pub disabled: usize,
    /// Reminders whose dispatch or persistence failed
    pub failed: usize,
}

pub struct ReminderScheduler<Tz: TimeZone> {
    scanner: DueReminderScanner,
    dispatcher: NotificationDispatcher,
    reminders: Arc<dyn ReminderStore>,
    notes: Arc<dyn NoteStore>,
    resolver: RecurrenceResolver<Tz>,
    clock: Arc<dyn Clock>,
    settings: watch::Receiver<ReminderSettings>,
    pass_guard: Mutex<()>,
    scanning: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl<Tz> ReminderScheduler<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    pub fn new(
        reminders: Arc<dyn ReminderStore>,
        notes: Arc<dyn NoteStore>,
        sink: Arc<dyn NotificationSink>,
        resolver: RecurrenceResolver<Tz>,
        settings: watch::Receiver<ReminderSettings>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            scanner: DueReminderScanner::new(Arc::clone(&reminders)),
            dispatcher: NotificationDispatcher::new(Arc::clone(&notes), sink),
            reminders,
            notes,
            resolver,
            clock: Arc::new(SystemClock),
            settings,
            pass_guard: Mutex::new(()),
            scanning: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Replace the wall clock, mainly for tests
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SchedulerState {
        if self.scanning.load(Ordering::SeqCst) {
            SchedulerState::Scanning
        } else {
            SchedulerState::Idle
        }
    }

    /// Stop the loop before its next tick. The reminder being processed
    /// finishes its dispatch and reschedule first. A cancelled scheduler
    /// does not restart.
    pub fn cancel(&self) {
        tracing::info!("Cancelling reminder scheduler");
        self.shutdown.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Spawn the polling loop
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run_loop().await })
    }

    async fn run_loop(&self) {
        let mut shutdown = self.shutdown.subscribe();
        let mut period = self.settings.borrow().poll_period();
        let mut ticker = poll_interval(Instant::now(), period);

        tracing::info!("Reminder scheduler started, polling every {:?}", period);

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            if let Some(report) = self.run_pass().await {
                if report.due > 0 {
                    tracing::info!(
                        "Pass finished: {} due, {} fired, {} rescheduled, {} disabled, {} failed",
                        report.due,
                        report.fired,
                        report.rescheduled,
                        report.disabled,
                        report.failed
                    );
                }
            }

            let current = self.settings.borrow().poll_period();
            if current != period {
                tracing::info!("Poll period changed from {:?} to {:?}", period, current);
                period = current;
                ticker = poll_interval(Instant::now() + period, period);
            }
        }

        tracing::info!("Reminder scheduler stopped");
    }

    /// Run one scan pass now. Returns `None` when another pass is in flight.
    pub async fn run_pass(&self) -> Option<PassReport> {
        let Ok(_guard) = self.pass_guard.try_lock() else {
            tracing::debug!("Scan pass already running, skipping");
            return None;
        };

        self.scanning.store(true, Ordering::SeqCst);
        let report = self.scan_and_fire().await;
        self.scanning.store(false, Ordering::SeqCst);

        Some(report)
    }

    async fn scan_and_fire(&self) -> PassReport {
        let settings = *self.settings.borrow();
        let now = self.clock.now();
        let mut report = PassReport::default();

        let due = match self.scanner.scan(now, settings.enabled).await {
            Ok(due) => due,
            Err(e) => {
                tracing::error!("Error scanning reminders: {}", e);
                return report;
            }
        };
        report.due = due.len();

        for reminder in &due {
            if self.is_cancelled() {
                tracing::info!("Scheduler cancelled mid-pass, leaving remaining reminders due");
                break;
            }

            if let Err(e) = self.fire(reminder, now, &mut report).await {
                report.failed += 1;
                tracing::error!("Error processing reminder {}: {}", reminder.id, e);
            }
        }

        report
    }

    async fn fire(&self, reminder: &Reminder, now: DateTime<Utc>, report: &mut PassReport) -> Result<()> {
        tracing::info!("Triggering reminder {} for note {}", reminder.id, reminder.note_id);

        let note = self.dispatcher.resolve_note(reminder).await;
        self.dispatcher.deliver(reminder, note.as_ref()).await?;
        report.fired += 1;

        let note_interval = note.as_ref().map(|n| n.repeat_interval_minutes);
        match self.resolver.next_occurrence(reminder, note_interval, now) {
            Outcome::Reschedule(next) => {
                self.reminders.update_trigger_instant(&reminder.id, next).await?;
                report.rescheduled += 1;
                tracing::debug!("Reminder {} rescheduled to {}", reminder.id, next);
            }
            Outcome::Disable(reason) => {
                self.reminders.update_enabled(&reminder.id, false).await?;
                report.disabled += 1;
                tracing::debug!("Reminder {} disabled ({:?})", reminder.id, reason);

                if reason == DisableReason::OneShot {
                    if let Err(e) = self
                        .notes
                        .update_status(&reminder.note_id, NoteStatus::Completed)
                        .await
                    {
                        tracing::warn!("Could not complete note {}: {}", reminder.note_id, e);
                    }
                }
            }
        }

        Ok(())
    }
}

fn poll_interval(start: Instant, period: std::time::Duration) -> Interval {
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
