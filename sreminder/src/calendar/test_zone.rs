//! A time zone with daylight saving for tests
//!
//! UTC+1 in winter and UTC+2 in summer. In 2026 clocks jump from 02:00 to
//! 03:00 local on March 29 and fall back from 03:00 to 02:00 on
//! October 25.

use chrono::{FixedOffset, LocalResult, NaiveDate, NaiveDateTime, TimeZone};

#[derive(Debug, Clone, Copy)]
pub struct DstZone;

fn utc_at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn winter() -> FixedOffset {
    FixedOffset::east_opt(3600).unwrap()
}

fn summer() -> FixedOffset {
    FixedOffset::east_opt(2 * 3600).unwrap()
}

impl TimeZone for DstZone {
    type Offset = FixedOffset;

    fn from_offset(_offset: &FixedOffset) -> Self {
        DstZone
    }

    fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
        self.offset_from_local_datetime(&local.and_hms_opt(0, 0, 0).unwrap())
    }

    fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
        // Summer first: of two readings it is the earlier instant
        let valid: Vec<FixedOffset> = [summer(), winter()]
            .into_iter()
            .filter(|offset| self.offset_from_utc_datetime(&(*local - *offset)) == *offset)
            .collect();

        match valid.as_slice() {
            [] => LocalResult::None,
            [offset] => LocalResult::Single(*offset),
            [earliest, latest, ..] => LocalResult::Ambiguous(*earliest, *latest),
        }
    }

    fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
        self.offset_from_utc_datetime(&utc.and_hms_opt(0, 0, 0).unwrap())
    }

    fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
        if *utc >= utc_at(2026, 3, 29, 1) && *utc < utc_at(2026, 10, 25, 1) {
            summer()
        } else {
            winter()
        }
    }
}
