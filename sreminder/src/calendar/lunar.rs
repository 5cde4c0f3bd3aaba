//! Solar ↔ lunar date conversion
//!
//! This is a deterministic approximation of the Vietnamese lunar calendar,
//! not an astronomical one:
//! - odd months have 30 days, even months 29
//! - a year is leap when `(year * 12 + 7) mod 19 < 12`
//! - a leap year repeats one month (30 days) after
//!   `((year * 12 + 7) mod 19) mod 12 + 1`
//! - day 0 is 1900-01-31 (solar) = 1/1/1900 (lunar)
//!
//! Callers go through [`LunarCalendar`] so an exact table-driven calendar can
//! replace [`ApproximateLunarCalendar`] without touching the scheduler.

use super::resolve_local;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

const EPOCH_YEAR: i32 = 1900;

/// `num_days_from_ce` of 1900-01-31
const EPOCH_DAYS_FROM_CE: i64 = 693_626;

const COMMON_YEAR_DAYS: i64 = 354;
const LEAP_YEAR_DAYS: i64 = 384;
const LEAP_MONTH_DAYS: u32 = 30;

/// A date in the (approximate) lunar calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LunarDate {
    pub day: u32,
    pub month: u32,
    pub year: i32,
    #[serde(default)]
    pub is_leap_month: bool,
}

impl fmt::Display for LunarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.day, self.month, self.year)?;
        if self.is_leap_month {
            write!(f, " (leap)")?;
        }
        write!(f, " (lunar)")
    }
}

/// Conversion between solar dates and lunar dates.
pub trait LunarCalendar: Send + Sync {
    fn solar_to_lunar(&self, date: NaiveDate) -> LunarDate;

    fn lunar_to_solar(&self, lunar: &LunarDate) -> NaiveDate;

    /// The month a leap year repeats, if any
    fn leap_month(&self, year: i32) -> Option<u32>;

    /// The lunar month after the one `lunar` falls in, as
    /// `(year, month, is_leap_month)`. A regular month whose leap twin
    /// follows it steps into the twin.
    fn following_month(&self, lunar: &LunarDate) -> (i32, u32, bool) {
        if !lunar.is_leap_month && self.leap_month(lunar.year) == Some(lunar.month) {
            (lunar.year, lunar.month, true)
        } else if lunar.month >= 12 {
            (lunar.year + 1, 1, false)
        } else {
            (lunar.year, lunar.month + 1, false)
        }
    }

    /// `anchor_day` (or the current lunar day) in the following lunar
    /// month, clamped to that month's length.
    fn next_month_date(&self, date: NaiveDate, anchor_day: Option<u32>) -> NaiveDate {
        let lunar = self.solar_to_lunar(date);
        let (year, month, is_leap_month) = self.following_month(&lunar);

        self.lunar_to_solar(&LunarDate {
            day: anchor_day.unwrap_or(lunar.day),
            month,
            year,
            is_leap_month,
        })
    }

    /// `anchor_day` (or the current lunar day) of the same regular month
    /// in the following lunar year.
    fn next_year_date(&self, date: NaiveDate, anchor_day: Option<u32>) -> NaiveDate {
        let lunar = self.solar_to_lunar(date);

        self.lunar_to_solar(&LunarDate {
            day: anchor_day.unwrap_or(lunar.day),
            month: lunar.month,
            year: lunar.year + 1,
            is_leap_month: false,
        })
    }
}

/// The fixed 29/30-day approximation described in the module docs
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateLunarCalendar;

#[derive(Debug, Clone, Copy)]
struct LunarMonth {
    month: u32,
    is_leap: bool,
    days: u32,
}

fn month_days(month: u32) -> u32 {
    if month % 2 == 1 {
        30
    } else {
        29
    }
}

fn cycle_position(year: i32) -> i32 {
    (year * 12 + 7).rem_euclid(19)
}

/// Whether the lunar year carries a leap month
pub fn is_lunar_leap_year(year: i32) -> bool {
    cycle_position(year) < 12
}

/// The month repeated as a leap month, if any
pub fn leap_month(year: i32) -> Option<u32> {
    if !is_lunar_leap_year(year) {
        return None;
    }
    Some((cycle_position(year) % 12) as u32 + 1)
}

fn year_days(year: i32) -> i64 {
    if is_lunar_leap_year(year) {
        LEAP_YEAR_DAYS
    } else {
        COMMON_YEAR_DAYS
    }
}

fn year_months(year: i32) -> Vec<LunarMonth> {
    let leap = leap_month(year);
    let mut months = Vec::with_capacity(13);

    for month in 1..=12 {
        months.push(LunarMonth {
            month,
            is_leap: false,
            days: month_days(month),
        });
        if leap == Some(month) {
            months.push(LunarMonth {
                month,
                is_leap: true,
                days: LEAP_MONTH_DAYS,
            });
        }
    }

    months
}

fn date_from_offset(offset: i64) -> NaiveDate {
    let days = EPOCH_DAYS_FROM_CE + offset;
    i32::try_from(days)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .unwrap_or(if days < 0 {
            NaiveDate::MIN
        } else {
            NaiveDate::MAX
        })
}

impl LunarCalendar for ApproximateLunarCalendar {
    fn solar_to_lunar(&self, date: NaiveDate) -> LunarDate {
        let mut offset = i64::from(date.num_days_from_ce()) - EPOCH_DAYS_FROM_CE;
        let mut year = EPOCH_YEAR;

        while offset < 0 {
            year -= 1;
            offset += year_days(year);
        }
        while offset >= year_days(year) {
            offset -= year_days(year);
            year += 1;
        }

        let months = year_months(year);
        let mut idx = 0;
        while idx + 1 < months.len() && offset >= i64::from(months[idx].days) {
            offset -= i64::from(months[idx].days);
            idx += 1;
        }

        LunarDate {
            day: offset as u32 + 1,
            month: months[idx].month,
            year,
            is_leap_month: months[idx].is_leap,
        }
    }

    fn lunar_to_solar(&self, lunar: &LunarDate) -> NaiveDate {
        let mut offset: i64 = if lunar.year >= EPOCH_YEAR {
            (EPOCH_YEAR..lunar.year).map(year_days).sum()
        } else {
            -(lunar.year..EPOCH_YEAR).map(year_days).sum::<i64>()
        };

        let month = lunar.month.clamp(1, 12);
        let is_leap = lunar.is_leap_month && leap_month(lunar.year) == Some(month);

        for m in year_months(lunar.year) {
            if m.month == month && m.is_leap == is_leap {
                offset += i64::from(lunar.day.clamp(1, m.days)) - 1;
                break;
            }
            offset += i64::from(m.days);
        }

        date_from_offset(offset)
    }

    fn leap_month(&self, year: i32) -> Option<u32> {
        leap_month(year)
    }
}

/// Convert a solar date with the approximate calendar
pub fn solar_to_lunar(date: NaiveDate) -> LunarDate {
    ApproximateLunarCalendar.solar_to_lunar(date)
}

/// Convert a lunar date back with the approximate calendar
pub fn lunar_to_solar(lunar: &LunarDate) -> NaiveDate {
    ApproximateLunarCalendar.lunar_to_solar(lunar)
}

/// Move an instant to the same lunar day next lunar month, keeping its
/// local time-of-day.
pub fn next_lunar_month<Tz: TimeZone>(instant: &DateTime<Tz>) -> DateTime<Tz> {
    shift_local_date(instant, |date| ApproximateLunarCalendar.next_month_date(date, None))
}

/// Move an instant to the same lunar day and month next lunar year,
/// keeping its local time-of-day.
pub fn next_lunar_year<Tz: TimeZone>(instant: &DateTime<Tz>) -> DateTime<Tz> {
    shift_local_date(instant, |date| ApproximateLunarCalendar.next_year_date(date, None))
}

/// Replace the local date of `instant`, keeping its local time-of-day.
pub fn shift_local_date<Tz, F>(instant: &DateTime<Tz>, shift: F) -> DateTime<Tz>
where
    Tz: TimeZone,
    F: FnOnce(NaiveDate) -> NaiveDate,
{
    let local = instant.naive_local();
    let date = shift(local.date());
    resolve_local(&instant.timezone(), date.and_time(local.time()))
}

/// Render a lunar date, e.g. `15/8/2024 (lunar)`
pub fn format_lunar_date(lunar: &LunarDate) -> String {
    lunar.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, Timelike};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lunar(day: u32, month: u32, year: i32, is_leap_month: bool) -> LunarDate {
        LunarDate {
            day,
            month,
            year,
            is_leap_month,
        }
    }

    #[test]
    fn test_epoch_maps_to_first_lunar_day() {
        assert_eq!(solar_to_lunar(ymd(1900, 1, 31)), lunar(1, 1, 1900, false));
        assert_eq!(lunar_to_solar(&lunar(1, 1, 1900, false)), ymd(1900, 1, 31));
    }

    #[test]
    fn test_month_boundaries() {
        // month 1 has 30 days
        assert_eq!(solar_to_lunar(ymd(1900, 3, 1)), lunar(30, 1, 1900, false));
        assert_eq!(solar_to_lunar(ymd(1900, 3, 2)), lunar(1, 2, 1900, false));
        // the day before the epoch is the last day of month 12 (29 days) of 1899
        assert_eq!(solar_to_lunar(ymd(1900, 1, 30)), lunar(29, 12, 1899, false));
    }

    #[test]
    fn test_leap_year_predicate() {
        assert!(is_lunar_leap_year(1900));
        assert_eq!(leap_month(1900), Some(8));
        assert!(is_lunar_leap_year(2025));
        assert_eq!(leap_month(2025), Some(7));
        assert!(!is_lunar_leap_year(2024));
        assert_eq!(leap_month(2024), None);
        assert!(!is_lunar_leap_year(2026));
    }

    #[test]
    fn test_leap_month_is_flagged() {
        // 1900 repeats month 8 right after the regular month 8
        let regular = lunar(1, 8, 1900, false);
        let leap = lunar(1, 8, 1900, true);

        let regular_solar = lunar_to_solar(&regular);
        let leap_solar = lunar_to_solar(&leap);

        assert_eq!(leap_solar - regular_solar, Duration::days(29));
        assert_eq!(solar_to_lunar(leap_solar), leap);
    }

    #[test]
    fn test_leap_flag_ignored_outside_leap_month() {
        let flagged = lunar(10, 3, 1900, true);
        let plain = lunar(10, 3, 1900, false);
        assert_eq!(lunar_to_solar(&flagged), lunar_to_solar(&plain));
    }

    #[test]
    fn test_day_clamped_to_month_length() {
        // month 2 has 29 days
        let overflow = lunar(30, 2, 1900, false);
        assert_eq!(lunar_to_solar(&overflow), lunar_to_solar(&lunar(29, 2, 1900, false)));
    }

    #[test]
    fn test_round_trip_day_granularity() {
        let mut date = ymd(1800, 1, 1);
        let end = ymd(2200, 1, 1);
        while date < end {
            assert_eq!(lunar_to_solar(&solar_to_lunar(date)), date, "{}", date);
            date += Duration::days(3);
        }
    }

    #[test]
    fn test_next_lunar_month_known_dates() {
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        let start = tz.with_ymd_and_hms(2026, 10, 18, 8, 30, 0).unwrap();

        let next = next_lunar_month(&start);

        assert_eq!(next.date_naive(), ymd(2026, 11, 17));
        assert_eq!(next.hour(), 8);
        assert_eq!(next.minute(), 30);
    }

    #[test]
    fn test_next_lunar_month_rolls_year() {
        let tz = FixedOffset::east_opt(0).unwrap();
        // 29/12/1899
        let start = tz.with_ymd_and_hms(1900, 1, 30, 12, 0, 0).unwrap();

        let next = next_lunar_month(&start);

        assert_eq!(solar_to_lunar(next.date_naive()), lunar(29, 1, 1900, false));
        assert_eq!(next.date_naive(), ymd(1900, 2, 28));
    }

    #[test]
    fn test_next_lunar_month_steps_into_leap_month() {
        // 1/8/1900 is followed by the leap 8/1900, then by 9/1900
        let calendar = ApproximateLunarCalendar;
        let regular = lunar_to_solar(&lunar(1, 8, 1900, false));
        assert_eq!(regular, ymd(1900, 8, 26));

        let leap = calendar.next_month_date(regular, None);
        assert_eq!(leap, ymd(1900, 9, 24));
        assert_eq!(solar_to_lunar(leap), lunar(1, 8, 1900, true));

        let ninth = calendar.next_month_date(leap, None);
        assert_eq!(solar_to_lunar(ninth), lunar(1, 9, 1900, false));
        assert_eq!(ninth - leap, Duration::days(30));
    }

    #[test]
    fn test_next_month_date_reapplies_anchor_day() {
        let calendar = ApproximateLunarCalendar;
        // 29/2/2024 with day 30 wanted: the short month clamps, the next does not
        let clamped = lunar_to_solar(&lunar(29, 2, 2024, false));

        let next = calendar.next_month_date(clamped, Some(30));

        assert_eq!(solar_to_lunar(next), lunar(30, 3, 2024, false));
        assert_eq!(
            solar_to_lunar(calendar.next_month_date(clamped, None)),
            lunar(29, 3, 2024, false)
        );
    }

    #[test]
    fn test_next_year_date_leaves_leap_month() {
        let calendar = ApproximateLunarCalendar;
        let leap = lunar_to_solar(&lunar(15, 8, 1900, true));

        let next = calendar.next_year_date(leap, None);

        assert_eq!(solar_to_lunar(next), lunar(15, 8, 1901, false));
    }

    #[test]
    fn test_next_lunar_year_known_dates() {
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        let start = tz.with_ymd_and_hms(2026, 10, 18, 6, 0, 0).unwrap();

        let next = next_lunar_year(&start);

        assert_eq!(next.date_naive(), ymd(2027, 10, 7));
        assert_eq!(next.hour(), 6);
    }

    #[test]
    fn test_roll_forward_always_moves_forward() {
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        let mut date = ymd(1990, 1, 1);
        while date < ymd(2060, 1, 1) {
            let instant = tz.from_local_datetime(&date.and_hms_opt(0, 0, 0).unwrap()).unwrap();
            assert!(next_lunar_month(&instant) > instant);
            assert!(next_lunar_year(&instant) > next_lunar_month(&instant));
            date += Duration::days(5);
        }
    }

    #[test]
    fn test_format_lunar_date() {
        assert_eq!(format_lunar_date(&lunar(15, 8, 2024, false)), "15/8/2024 (lunar)");
        assert_eq!(
            format_lunar_date(&lunar(1, 4, 2025, true)),
            "1/4/2025 (leap) (lunar)"
        );
    }
}
