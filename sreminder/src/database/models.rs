//! Database models
//!
//! Rust structs representing database entities, plus the repeat policy
//! parsed from a reminder's stored tag.

use crate::config::ANCHOR_TIME_FORMAT;
use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// What a note is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Plain = 1,
    OneShotReminder = 2,
    RecurringReminder = 3,
}

/// Lifecycle status of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    Active,
    Completed,
}

/// A user note
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub note_kind: NoteKind,
    pub status: NoteStatus,
    /// Repeat interval in minutes, only read by minutely/hourly reminders
    pub repeat_interval_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create note request
#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: Option<String>,
    pub note_kind: NoteKind,
    #[serde(default)]
    pub repeat_interval_minutes: i64,
}

/// How a fired reminder computes its next trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatPolicy {
    None,
    Interval,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    SolarMonthly,
    LunarMonthly,
    SolarYearly,
    LunarYearly,
}

impl RepeatPolicy {
    /// Tag stored in the `repeat_type` column
    pub fn as_tag(self) -> &'static str {
        match self {
            RepeatPolicy::None => "none",
            RepeatPolicy::Interval => "interval",
            RepeatPolicy::Minutely => "minutely",
            RepeatPolicy::Hourly => "hourly",
            RepeatPolicy::Daily => "daily",
            RepeatPolicy::Weekly => "weekly",
            RepeatPolicy::SolarMonthly => "solar_monthly",
            RepeatPolicy::LunarMonthly => "lunar_monthly",
            RepeatPolicy::SolarYearly => "solar_yearly",
            RepeatPolicy::LunarYearly => "lunar_yearly",
        }
    }

    /// Parse an optional stored tag; absent or empty means [`RepeatPolicy::None`]
    pub fn from_tag(tag: Option<&str>) -> Result<Self> {
        match tag.map(str::trim) {
            None | Some("") => Ok(RepeatPolicy::None),
            Some(tag) => tag.parse(),
        }
    }

    /// Lunar policies anchor on a lunar day rather than a solar one
    pub fn is_lunar(self) -> bool {
        matches!(self, RepeatPolicy::LunarMonthly | RepeatPolicy::LunarYearly)
    }

    /// Policies that carry an anchor day-of-month and time-of-day
    pub fn is_calendar_anchored(self) -> bool {
        matches!(
            self,
            RepeatPolicy::SolarMonthly
                | RepeatPolicy::LunarMonthly
                | RepeatPolicy::SolarYearly
                | RepeatPolicy::LunarYearly
        )
    }

    /// Policies whose step is the owning note's repeat interval
    pub fn uses_note_interval(self) -> bool {
        matches!(self, RepeatPolicy::Minutely | RepeatPolicy::Hourly)
    }
}

impl FromStr for RepeatPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(RepeatPolicy::None),
            "interval" => Ok(RepeatPolicy::Interval),
            "minutely" => Ok(RepeatPolicy::Minutely),
            "hourly" => Ok(RepeatPolicy::Hourly),
            "daily" => Ok(RepeatPolicy::Daily),
            "weekly" => Ok(RepeatPolicy::Weekly),
            "solar_monthly" => Ok(RepeatPolicy::SolarMonthly),
            "lunar_monthly" => Ok(RepeatPolicy::LunarMonthly),
            "solar_yearly" => Ok(RepeatPolicy::SolarYearly),
            "lunar_yearly" => Ok(RepeatPolicy::LunarYearly),
            _ => Err(AppError::UnknownRepeatPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for RepeatPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Scheduled trigger bound to a note
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reminder {
    pub id: String,
    pub note_id: String,
    /// Next unfired occurrence
    pub trigger_time: DateTime<Utc>,
    /// Raw policy tag; see [`Reminder::policy`]
    pub repeat_type: Option<String>,
    pub repeat_interval_seconds: Option<i64>,
    /// Anchor day-of-month (1-31)
    pub repeat_day: Option<i32>,
    /// Anchor time-of-day, `HH:mm`
    pub repeat_time: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reminder {
    /// Parsed repeat policy
    pub fn policy(&self) -> Result<RepeatPolicy> {
        RepeatPolicy::from_tag(self.repeat_type.as_deref())
    }

    /// Parsed anchor time-of-day, if stored
    pub fn anchor_time(&self) -> Result<Option<NaiveTime>> {
        self.repeat_time
            .as_deref()
            .map(parse_anchor_time)
            .transpose()
    }
}

/// Parse an `HH:mm` anchor time
pub fn parse_anchor_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), ANCHOR_TIME_FORMAT)
        .map_err(|_| AppError::InvalidAnchorTime(value.to_string()))
}

/// Format an anchor time as `HH:mm`
pub fn format_anchor_time(time: NaiveTime) -> String {
    time.format(ANCHOR_TIME_FORMAT).to_string()
}

/// Create reminder request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReminderRequest {
    pub note_id: String,
    pub trigger_time: DateTime<Utc>,
    pub repeat_policy: RepeatPolicy,
    #[serde(default)]
    pub repeat_interval_seconds: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_policy_tags() {
        let all = [
            RepeatPolicy::None,
            RepeatPolicy::Interval,
            RepeatPolicy::Minutely,
            RepeatPolicy::Hourly,
            RepeatPolicy::Daily,
            RepeatPolicy::Weekly,
            RepeatPolicy::SolarMonthly,
            RepeatPolicy::LunarMonthly,
            RepeatPolicy::SolarYearly,
            RepeatPolicy::LunarYearly,
        ];

        for policy in all {
            assert_eq!(policy.as_tag().parse::<RepeatPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_absent_tag_is_none() {
        assert_eq!(RepeatPolicy::from_tag(None).unwrap(), RepeatPolicy::None);
        assert_eq!(RepeatPolicy::from_tag(Some("  ")).unwrap(), RepeatPolicy::None);
    }

    #[test]
    fn test_unknown_tag_is_error() {
        let err = RepeatPolicy::from_tag(Some("fortnightly")).unwrap_err();
        assert!(matches!(err, AppError::UnknownRepeatPolicy(tag) if tag == "fortnightly"));
    }

    #[test]
    fn test_anchor_time_parsing() {
        let time = parse_anchor_time("07:05").unwrap();
        assert_eq!(format_anchor_time(time), "07:05");

        assert!(parse_anchor_time("7 o'clock").is_err());
        assert!(parse_anchor_time("25:00").is_err());
    }

    #[test]
    fn test_calendar_anchored_policies() {
        assert!(RepeatPolicy::SolarMonthly.is_calendar_anchored());
        assert!(RepeatPolicy::LunarYearly.is_calendar_anchored());
        assert!(!RepeatPolicy::Daily.is_calendar_anchored());
        assert!(RepeatPolicy::LunarMonthly.is_lunar());
        assert!(!RepeatPolicy::SolarYearly.is_lunar());
        assert!(RepeatPolicy::Hourly.uses_note_interval());
        assert!(!RepeatPolicy::Interval.uses_note_interval());
    }
}
