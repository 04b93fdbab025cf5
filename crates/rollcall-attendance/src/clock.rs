use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use rollcall_types::models::Event;

use crate::error::AttendanceError;

/// Formats accepted for `startTime`/`endTime` and manual time corrections.
/// HTML time inputs send `HH:MM`; records carry the `hh:mm AM` form.
const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M:%S %p"];

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_wall_clock(raw: &str) -> Result<NaiveTime, AttendanceError> {
    let trimmed = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| AttendanceError::InvalidTime(raw.to_string()))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, AttendanceError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| AttendanceError::InvalidDate(raw.to_string()))
}

/// Minutes since midnight. Seconds are ignored.
pub fn minutes_of_day<T: Timelike>(t: &T) -> u32 {
    t.hour() * 60 + t.minute()
}

/// The label stored in `timeIn`/`timeOut`.
pub fn format_clock<T: Timelike>(t: &T) -> String {
    let (pm, hour) = t.hour12();
    format!("{:02}:{:02} {}", hour, t.minute(), if pm { "PM" } else { "AM" })
}

/// An event's parsed wall-clock boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Schedule {
    pub fn of(event: &Event) -> Result<Self, AttendanceError> {
        Ok(Self {
            date: parse_date(&event.date)?,
            start: parse_wall_clock(&event.start_time)?,
            end: parse_wall_clock(&event.end_time)?,
        })
    }

    /// Only the time-of-day boundaries, for events whose date is not needed.
    pub fn times_of(event: &Event) -> Result<(u32, u32), AttendanceError> {
        let start = parse_wall_clock(&event.start_time)?;
        let end = parse_wall_clock(&event.end_time)?;
        Ok((minutes_of_day(&start), minutes_of_day(&end)))
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.end)
    }
}
