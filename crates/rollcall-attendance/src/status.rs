use chrono::NaiveDateTime;

use rollcall_types::models::{CheckInStatus, CheckOutStatus, Event, EventStatus, FinalStatus};

use crate::clock::Schedule;
use crate::error::AttendanceError;

/// On time up to and including the start minute.
pub fn time_in_status(scan_minutes: u32, start_minutes: u32) -> CheckInStatus {
    if scan_minutes <= start_minutes {
        CheckInStatus::Present
    } else {
        CheckInStatus::Late
    }
}

/// Leaving at the end minute or later counts as present.
pub fn time_out_status(scan_minutes: u32, end_minutes: u32) -> CheckOutStatus {
    if scan_minutes < end_minutes {
        CheckOutStatus::EarlyOut
    } else {
        CheckOutStatus::Present
    }
}

/// Combine both evaluations. Precedence: Absent, Early Out, Late, Present.
pub fn final_status(status: CheckInStatus, time_out: Option<CheckOutStatus>) -> FinalStatus {
    match (status, time_out) {
        (CheckInStatus::Absent, _) => FinalStatus::Absent,
        (_, Some(CheckOutStatus::EarlyOut)) => FinalStatus::EarlyOut,
        (CheckInStatus::Late, _) => FinalStatus::Late,
        (CheckInStatus::Present, _) => FinalStatus::Present,
    }
}

pub fn event_status(event: &Event, now: NaiveDateTime) -> Result<EventStatus, AttendanceError> {
    let schedule = Schedule::of(event)?;
    Ok(if now < schedule.starts_at() {
        EventStatus::Upcoming
    } else if now < schedule.ends_at() {
        EventStatus::Ongoing
    } else {
        EventStatus::Completed
    })
}
