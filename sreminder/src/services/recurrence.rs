//! Recurrence policy resolver
//!
//! Computes what happens to a reminder once it has fired: either it is
//! disabled, or it gets a new trigger instant strictly after the firing.
//! Calendar arithmetic runs in the resolver's time zone.

use crate::calendar::{
    at_local, clamped_date, next_month, ApproximateLunarCalendar, LunarCalendar, LunarDate,
};
use crate::database::{Reminder, RepeatPolicy};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use std::sync::Arc;

/// Why a fired reminder is switched off instead of rescheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableReason {
    /// One-shot reminder fired its only occurrence
    OneShot,
    /// Stored policy tag is not recognized
    UnknownPolicy,
    /// Missing, zero or negative repeat interval
    InvalidInterval,
    /// Next occurrence falls outside the representable calendar
    OutOfRange,
}

/// Result of resolving a fired reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Disable(DisableReason),
    Reschedule(DateTime<Utc>),
}

/// Resolves the next trigger of a fired reminder
#[derive(Clone)]
pub struct RecurrenceResolver<Tz: TimeZone> {
    tz: Tz,
    lunar: Arc<dyn LunarCalendar>,
}

impl<Tz: TimeZone> RecurrenceResolver<Tz> {
    pub fn new(tz: Tz) -> Self {
        Self::with_lunar_calendar(tz, Arc::new(ApproximateLunarCalendar))
    }

    pub fn with_lunar_calendar(tz: Tz, lunar: Arc<dyn LunarCalendar>) -> Self {
        Self { tz, lunar }
    }

    pub fn time_zone(&self) -> &Tz {
        &self.tz
    }

    pub fn lunar_calendar(&self) -> &dyn LunarCalendar {
        self.lunar.as_ref()
    }

    /// Decide the outcome of `reminder` firing at `fired_at`.
    ///
    /// `note_interval_minutes` is the owning note's repeat interval; only
    /// minutely and hourly reminders read it.
    pub fn next_occurrence(
        &self,
        reminder: &Reminder,
        note_interval_minutes: Option<i64>,
        fired_at: DateTime<Utc>,
    ) -> Outcome {
        let policy = match reminder.policy() {
            Ok(policy) => policy,
            Err(e) => {
                tracing::warn!("Disabling reminder {}: {}", reminder.id, e);
                return Outcome::Disable(DisableReason::UnknownPolicy);
            }
        };

        let next = match policy {
            RepeatPolicy::None => return Outcome::Disable(DisableReason::OneShot),
            RepeatPolicy::Interval => {
                let step = reminder
                    .repeat_interval_seconds
                    .and_then(Duration::try_seconds);
                return self.step(reminder, fired_at, step);
            }
            RepeatPolicy::Minutely | RepeatPolicy::Hourly => {
                let step = note_interval_minutes.and_then(Duration::try_minutes);
                return self.step(reminder, fired_at, step);
            }
            RepeatPolicy::Daily => self.next_daily(reminder, fired_at),
            RepeatPolicy::Weekly => self.next_weekly(reminder, fired_at),
            RepeatPolicy::SolarMonthly => self.next_solar_monthly(reminder, fired_at),
            RepeatPolicy::SolarYearly => self.next_solar_yearly(reminder, fired_at),
            RepeatPolicy::LunarMonthly => self.next_lunar_monthly(reminder, fired_at),
            RepeatPolicy::LunarYearly => self.next_lunar_yearly(reminder, fired_at),
        };

        match next {
            Some(next) if next > fired_at => Outcome::Reschedule(next),
            _ => {
                tracing::warn!(
                    "Reminder {} ({}) has no occurrence after {}",
                    reminder.id,
                    policy,
                    fired_at
                );
                Outcome::Disable(DisableReason::OutOfRange)
            }
        }
    }

    fn step(&self, reminder: &Reminder, fired_at: DateTime<Utc>, step: Option<Duration>) -> Outcome {
        match step.filter(|step| *step > Duration::zero()) {
            Some(step) => match fired_at.checked_add_signed(step) {
                Some(next) => Outcome::Reschedule(next),
                None => Outcome::Disable(DisableReason::OutOfRange),
            },
            None => {
                tracing::warn!(
                    "Disabling reminder {}: repeat interval is missing or not positive",
                    reminder.id
                );
                Outcome::Disable(DisableReason::InvalidInterval)
            }
        }
    }

    fn local(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.tz)
    }

    fn trigger_time_of_day(&self, reminder: &Reminder) -> NaiveTime {
        self.local(reminder.trigger_time).time()
    }

    /// Stored anchor time, falling back to the trigger's local time-of-day
    fn anchor_time(&self, reminder: &Reminder) -> NaiveTime {
        match reminder.anchor_time() {
            Ok(Some(time)) => time,
            Ok(None) => self.trigger_time_of_day(reminder),
            Err(e) => {
                tracing::warn!("Reminder {}: {}, using trigger time", reminder.id, e);
                self.trigger_time_of_day(reminder)
            }
        }
    }

    fn stored_day(reminder: &Reminder) -> Option<u32> {
        reminder
            .repeat_day
            .and_then(|day| u32::try_from(day).ok())
            .filter(|day| (1..=31).contains(day))
    }

    /// Stored anchor day, falling back to the trigger's local day-of-month
    fn anchor_day(&self, reminder: &Reminder) -> u32 {
        Self::stored_day(reminder).unwrap_or_else(|| self.local(reminder.trigger_time).day())
    }

    /// Stored lunar anchor day, falling back to the trigger's lunar day
    fn lunar_anchor_day(&self, reminder: &Reminder) -> u32 {
        Self::stored_day(reminder).unwrap_or_else(|| self.trigger_lunar_date(reminder).day)
    }

    fn trigger_lunar_date(&self, reminder: &Reminder) -> LunarDate {
        self.lunar
            .solar_to_lunar(self.local(reminder.trigger_time).date_naive())
    }

    fn at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        at_local(&self.tz, date, time).with_timezone(&Utc)
    }

    /// Daily and weekly carry no stored anchor; the time-of-day comes from
    /// the current trigger. A trigger pushed out of a DST gap (02:30 becomes
    /// 03:30) therefore keeps the later time on following days.
    fn next_daily(&self, reminder: &Reminder, fired_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let time = self.trigger_time_of_day(reminder);
        let today = self.local(fired_at).date_naive();

        let candidate = self.at(today, time);
        if candidate > fired_at {
            return Some(candidate);
        }
        today.succ_opt().map(|tomorrow| self.at(tomorrow, time))
    }

    fn next_weekly(&self, reminder: &Reminder, fired_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let time = self.trigger_time_of_day(reminder);
        let weekday = self.local(reminder.trigger_time).weekday();

        let mut date = self.local(fired_at).date_naive();
        let mut candidate = self.at(date, time);
        while date.weekday() != weekday || candidate <= fired_at {
            date = date.succ_opt()?;
            candidate = self.at(date, time);
        }
        Some(candidate)
    }

    fn next_solar_monthly(
        &self,
        reminder: &Reminder,
        fired_at: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let day = self.anchor_day(reminder);
        let time = self.anchor_time(reminder);
        let fired = self.local(fired_at);

        let candidate = self.at(clamped_date(fired.year(), fired.month(), day)?, time);
        if candidate > fired_at {
            return Some(candidate);
        }

        let (year, month) = next_month(fired.year(), fired.month());
        Some(self.at(clamped_date(year, month, day)?, time))
    }

    fn next_solar_yearly(
        &self,
        reminder: &Reminder,
        fired_at: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let day = self.anchor_day(reminder);
        let time = self.anchor_time(reminder);
        let month = self.local(reminder.trigger_time).month();
        let year = self.local(fired_at).year();

        let candidate = self.at(clamped_date(year, month, day)?, time);
        if candidate > fired_at {
            return Some(candidate);
        }
        Some(self.at(clamped_date(year + 1, month, day)?, time))
    }

    /// The anchor lunar day is re-applied every month, so a day-30 anchor
    /// clamped to 29 in a short month comes back to 30 afterwards.
    fn next_lunar_monthly(
        &self,
        reminder: &Reminder,
        fired_at: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let day = self.lunar_anchor_day(reminder);
        let time = self.anchor_time(reminder);
        let today = self.local(fired_at).date_naive();
        let current = self.lunar.solar_to_lunar(today);

        let candidate = self.at(self.lunar.lunar_to_solar(&LunarDate { day, ..current }), time);
        if candidate > fired_at {
            return Some(candidate);
        }
        Some(self.at(self.lunar.next_month_date(today, Some(day)), time))
    }

    fn next_lunar_yearly(
        &self,
        reminder: &Reminder,
        fired_at: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let day = self.lunar_anchor_day(reminder);
        let time = self.anchor_time(reminder);
        let month = self.trigger_lunar_date(reminder).month;
        let year = self
            .lunar
            .solar_to_lunar(self.local(fired_at).date_naive())
            .year;

        let in_year = |year: i32| LunarDate {
            day,
            month,
            year,
            is_leap_month: false,
        };

        let candidate = self.at(self.lunar.lunar_to_solar(&in_year(year)), time);
        if candidate > fired_at {
            return Some(candidate);
        }
        Some(self.at(self.lunar.lunar_to_solar(&in_year(year + 1)), time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike, Weekday};

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        tz().with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn reminder(policy: &str, trigger_time: DateTime<Utc>) -> Reminder {
        Reminder {
            id: "r1".to_string(),
            note_id: "n1".to_string(),
            trigger_time,
            repeat_type: Some(policy.to_string()),
            repeat_interval_seconds: None,
            repeat_day: None,
            repeat_time: None,
            enabled: true,
            created_at: trigger_time,
            updated_at: trigger_time,
        }
    }

    fn anchored(policy: &str, trigger_time: DateTime<Utc>, day: i32, time: &str) -> Reminder {
        Reminder {
            repeat_day: Some(day),
            repeat_time: Some(time.to_string()),
            ..reminder(policy, trigger_time)
        }
    }

    fn resolver() -> RecurrenceResolver<FixedOffset> {
        RecurrenceResolver::new(tz())
    }

    fn rescheduled(outcome: Outcome) -> DateTime<Utc> {
        match outcome {
            Outcome::Reschedule(next) => next,
            other => panic!("expected reschedule, got {:?}", other),
        }
    }

    #[test]
    fn test_one_shot_disables() {
        let fired = local(2024, 5, 1, 9, 0);
        for tag in [None, Some(""), Some("none")] {
            let r = Reminder {
                repeat_type: tag.map(str::to_string),
                ..reminder("none", fired)
            };
            assert_eq!(
                resolver().next_occurrence(&r, None, fired),
                Outcome::Disable(DisableReason::OneShot)
            );
        }
    }

    #[test]
    fn test_unknown_policy_disables() {
        let fired = local(2024, 5, 1, 9, 0);
        let r = reminder("every_full_moon", fired);

        assert_eq!(
            resolver().next_occurrence(&r, None, fired),
            Outcome::Disable(DisableReason::UnknownPolicy)
        );
    }

    #[test]
    fn test_fixed_interval_eight_hours() {
        let trigger = local(2024, 5, 1, 9, 0);
        let fired = trigger + Duration::seconds(17);
        let r = Reminder {
            repeat_interval_seconds: Some(28_800),
            ..reminder("interval", trigger)
        };

        let next = rescheduled(resolver().next_occurrence(&r, None, fired));

        assert_eq!(next - fired, Duration::hours(8));
    }

    #[test]
    fn test_fixed_interval_exact_for_many_intervals() {
        let fired = local(2024, 2, 28, 23, 59);
        for seconds in [1_i64, 59, 3_600, 86_399, 86_400, 2_678_400] {
            let r = Reminder {
                repeat_interval_seconds: Some(seconds),
                ..reminder("interval", fired)
            };
            let next = rescheduled(resolver().next_occurrence(&r, None, fired));
            assert_eq!((next - fired).num_seconds(), seconds);
        }
    }

    #[test]
    fn test_invalid_intervals_disable() {
        let fired = local(2024, 5, 1, 9, 0);

        for seconds in [None, Some(0), Some(-30)] {
            let r = Reminder {
                repeat_interval_seconds: seconds,
                ..reminder("interval", fired)
            };
            assert_eq!(
                resolver().next_occurrence(&r, None, fired),
                Outcome::Disable(DisableReason::InvalidInterval)
            );
        }

        for minutes in [None, Some(0), Some(-5)] {
            assert_eq!(
                resolver().next_occurrence(&reminder("minutely", fired), minutes, fired),
                Outcome::Disable(DisableReason::InvalidInterval)
            );
        }
    }

    #[test]
    fn test_minutely_and_hourly_use_note_interval() {
        let fired = local(2024, 5, 1, 9, 0);

        let minutely = reminder("minutely", fired);
        let next = rescheduled(resolver().next_occurrence(&minutely, Some(15), fired));
        assert_eq!(next - fired, Duration::minutes(15));

        let hourly = reminder("hourly", fired);
        let next = rescheduled(resolver().next_occurrence(&hourly, Some(120), fired));
        assert_eq!(next - fired, Duration::hours(2));
    }

    #[test]
    fn test_daily_same_day_when_time_not_reached() {
        // Fired early (manual completion) at 06:00, original time 09:00
        let r = reminder("daily", local(2024, 5, 1, 9, 0));
        let fired = local(2024, 5, 3, 6, 0);

        let next = rescheduled(resolver().next_occurrence(&r, None, fired));
        assert_eq!(next, local(2024, 5, 3, 9, 0));
    }

    #[test]
    fn test_daily_next_day_when_time_passed() {
        let r = reminder("daily", local(2024, 5, 1, 9, 0));
        let fired = local(2024, 5, 3, 14, 0);

        let next = rescheduled(resolver().next_occurrence(&r, None, fired));
        assert_eq!(next, local(2024, 5, 4, 9, 0));
    }

    #[test]
    fn test_daily_tie_rolls_forward() {
        let trigger = local(2024, 5, 1, 9, 0);
        let r = reminder("daily", trigger);

        let next = rescheduled(resolver().next_occurrence(&r, None, trigger));
        assert_eq!(next, local(2024, 5, 2, 9, 0));
    }

    #[test]
    fn test_weekly_late_firing_goes_to_following_week() {
        // Tuesday 2024-05-07 09:00, fired late on Wednesday 14:00
        let trigger = local(2024, 5, 7, 9, 0);
        assert_eq!(trigger.with_timezone(&tz()).weekday(), Weekday::Tue);
        let r = reminder("weekly", trigger);
        let fired = local(2024, 5, 8, 14, 0);

        let next = rescheduled(resolver().next_occurrence(&r, None, fired));

        assert_eq!(next, local(2024, 5, 14, 9, 0));
        assert_eq!(next.with_timezone(&tz()).weekday(), Weekday::Tue);
    }

    #[test]
    fn test_weekly_on_time_firing() {
        let trigger = local(2024, 5, 7, 9, 0);
        let r = reminder("weekly", trigger);

        let fired = trigger + Duration::seconds(20);

        let next = rescheduled(resolver().next_occurrence(&r, None, fired));
        assert_eq!(next, local(2024, 5, 14, 9, 0));
    }

    #[test]
    fn test_solar_monthly_clamps_to_february() {
        let trigger = local(2023, 1, 31, 9, 0);
        let r = anchored("solar_monthly", trigger, 31, "09:00");

        let next = rescheduled(resolver().next_occurrence(&r, None, local(2023, 1, 31, 9, 0)));
        assert_eq!(next, local(2023, 2, 28, 9, 0));

        let leap_trigger = local(2024, 1, 31, 9, 0);
        let r = anchored("solar_monthly", leap_trigger, 31, "09:00");
        let next = rescheduled(resolver().next_occurrence(&r, None, local(2024, 1, 31, 9, 1)));
        assert_eq!(next, local(2024, 2, 29, 9, 0));
    }

    #[test]
    fn test_solar_monthly_clamps_to_thirty_days() {
        let r = anchored("solar_monthly", local(2024, 3, 31, 8, 0), 31, "08:00");

        let next = rescheduled(resolver().next_occurrence(&r, None, local(2024, 3, 31, 8, 0)));
        assert_eq!(next, local(2024, 4, 30, 8, 0));
    }

    #[test]
    fn test_solar_monthly_returns_to_anchor_after_short_month() {
        // Stored trigger already clamped to Feb 28, anchor stays 31
        let r = anchored("solar_monthly", local(2023, 2, 28, 9, 0), 31, "09:00");

        let next = rescheduled(resolver().next_occurrence(&r, None, local(2023, 2, 28, 9, 0)));
        assert_eq!(next, local(2023, 3, 31, 9, 0));
    }

    #[test]
    fn test_solar_monthly_later_this_month() {
        let r = anchored("solar_monthly", local(2024, 4, 5, 9, 0), 20, "18:30");

        let next = rescheduled(resolver().next_occurrence(&r, None, local(2024, 4, 5, 9, 0)));
        assert_eq!(next, local(2024, 4, 20, 18, 30));
    }

    #[test]
    fn test_solar_monthly_missing_anchor_uses_trigger() {
        let r = reminder("solar_monthly", local(2024, 4, 15, 7, 45));

        let next = rescheduled(resolver().next_occurrence(&r, None, local(2024, 4, 15, 7, 45)));
        assert_eq!(next, local(2024, 5, 15, 7, 45));
    }

    #[test]
    fn test_solar_yearly_rolls_year_and_clamps_leap_day() {
        let r = anchored("solar_yearly", local(2024, 2, 29, 10, 0), 29, "10:00");

        let next = rescheduled(resolver().next_occurrence(&r, None, local(2024, 2, 29, 10, 0)));
        assert_eq!(next, local(2025, 2, 28, 10, 0));
    }

    #[test]
    fn test_solar_yearly_same_year_when_not_reached() {
        let r = anchored("solar_yearly", local(2023, 12, 24, 20, 0), 24, "20:00");

        let next = rescheduled(resolver().next_occurrence(&r, None, local(2024, 3, 1, 9, 0)));
        assert_eq!(next, local(2024, 12, 24, 20, 0));
    }

    #[test]
    fn test_lunar_monthly_uses_anchor_time() {
        let fired = local(2026, 10, 18, 8, 30);
        let r = anchored("lunar_monthly", fired, 16, "07:00");

        let next = rescheduled(resolver().next_occurrence(&r, None, fired));

        let next_local = next.with_timezone(&tz());
        assert_eq!(next_local.date_naive(), NaiveDate::from_ymd_opt(2026, 11, 17).unwrap());
        assert_eq!((next_local.hour(), next_local.minute()), (7, 0));
    }

    #[test]
    fn test_lunar_yearly() {
        let fired = local(2026, 10, 18, 6, 0);
        let r = anchored("lunar_yearly", fired, 16, "06:00");

        let next = rescheduled(resolver().next_occurrence(&r, None, fired));

        assert_eq!(next, local(2027, 10, 7, 6, 0));
    }

    #[test]
    fn test_lunar_monthly_day_30_survives_short_months() {
        // 30/1/2024 (lunar) falls on 2026-11-01 in this calendar
        let trigger = local(2026, 11, 1, 9, 0);
        let r = anchored("lunar_monthly", trigger, 30, "09:00");
        let resolver = resolver();

        let mut fired = trigger;
        let mut seen = Vec::new();
        for _ in 0..4 {
            fired = rescheduled(resolver.next_occurrence(&r, None, fired));
            seen.push(fired);
        }

        assert_eq!(
            seen,
            vec![
                local(2026, 11, 30, 9, 0),
                local(2026, 12, 30, 9, 0),
                local(2027, 1, 28, 9, 0),
                local(2027, 2, 27, 9, 0),
            ]
        );
    }

    #[test]
    fn test_lunar_monthly_visits_leap_month() {
        let utc = RecurrenceResolver::new(Utc);
        // 1/8/1900, then the leap 8/1900, then 9/1900
        let trigger = Utc.with_ymd_and_hms(1900, 8, 26, 9, 0, 0).unwrap();
        let r = Reminder {
            repeat_day: Some(1),
            repeat_time: Some("09:00".to_string()),
            ..reminder("lunar_monthly", trigger)
        };

        let leap = rescheduled(utc.next_occurrence(&r, None, trigger));
        assert_eq!(leap, Utc.with_ymd_and_hms(1900, 9, 24, 9, 0, 0).unwrap());

        let ninth = rescheduled(utc.next_occurrence(&r, None, leap));
        assert_eq!(ninth, Utc.with_ymd_and_hms(1900, 10, 24, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_lunar_monthly_fired_early_keeps_current_month() {
        let trigger = local(2026, 11, 1, 9, 0);
        let r = anchored("lunar_monthly", trigger, 30, "09:00");

        // Completed a day before the anchor in the same lunar month
        let next = rescheduled(resolver().next_occurrence(&r, None, local(2026, 10, 31, 9, 0)));
        assert_eq!(next, trigger);
    }

    #[test]
    fn test_daily_across_dst_gap() {
        use crate::calendar::test_zone::DstZone;

        let zone = RecurrenceResolver::new(DstZone);
        let at = |d: u32, h: u32, min: u32| {
            DstZone
                .with_ymd_and_hms(2026, 3, d, h, min, 0)
                .unwrap()
                .with_timezone(&Utc)
        };

        // 02:30 does not exist on the 29th: that day fires an hour later
        let trigger = at(28, 2, 30);
        let gap_day = rescheduled(zone.next_occurrence(&reminder("daily", trigger), None, trigger));
        assert_eq!(gap_day, at(29, 3, 30));
        assert_eq!(gap_day - trigger, Duration::hours(24));

        // The shifted time-of-day sticks to the following days
        let after = rescheduled(zone.next_occurrence(&reminder("daily", gap_day), None, gap_day));
        assert_eq!(after, at(30, 3, 30));
    }

    #[test]
    fn test_calendar_policies_always_move_forward() {
        let policies = [
            "daily",
            "weekly",
            "solar_monthly",
            "solar_yearly",
            "lunar_monthly",
            "lunar_yearly",
        ];
        let trigger = local(2024, 1, 31, 23, 30);
        let resolver = resolver();

        for policy in policies {
            let r = anchored(policy, trigger, 31, "23:30");
            let mut fired = trigger - Duration::days(3);
            let end = trigger + Duration::days(800);
            while fired < end {
                let next = rescheduled(resolver.next_occurrence(&r, None, fired));
                assert!(next > fired, "{} at {}", policy, fired);
                fired += Duration::minutes(1_337);
            }
        }
    }

    #[test]
    fn test_utc_resolver_daily() {
        let resolver = RecurrenceResolver::new(Utc);
        let trigger = Utc.with_ymd_and_hms(2024, 5, 1, 22, 15, 0).unwrap();
        let r = reminder("daily", trigger);

        let next = rescheduled(resolver.next_occurrence(&r, None, trigger + Duration::hours(3)));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 2, 22, 15, 0).unwrap());
    }
}
