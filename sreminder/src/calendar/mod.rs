//! Calendar helpers
//!
//! Local wall-clock arithmetic shared by the recurrence resolver and the
//! lunar calendar conversion.

pub mod lunar;

#[cfg(test)]
pub(crate) mod test_zone;

pub use lunar::{
    format_lunar_date, is_lunar_leap_year, leap_month, lunar_to_solar, next_lunar_month,
    next_lunar_year, solar_to_lunar, ApproximateLunarCalendar, LunarCalendar, LunarDate,
};

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// Number of days in a Gregorian month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ if NaiveDate::from_ymd_opt(year, 2, 29).is_some() => 29,
        _ => 28,
    }
}

/// Build a date, clamping `day` to the last day of the month.
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Move a (year, month) pair forward by one month.
pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Resolve a local wall-clock time in `tz` to an instant.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a
/// DST gap are moved forward past the gap.
pub fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}

/// Combine a local date and time-of-day in `tz`.
pub fn at_local<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    resolve_local(tz, date.and_time(time))
}
