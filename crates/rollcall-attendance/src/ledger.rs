use chrono::{NaiveDateTime, NaiveTime};

use rollcall_types::api::{AttendancePatch, ScanKind};
use rollcall_types::models::{AttendanceRecord, CheckInStatus, Event, FinalStatus, User};

use crate::clock::{Schedule, format_clock, minutes_of_day, parse_wall_clock};
use crate::error::AttendanceError;
use crate::status::{final_status, time_in_status, time_out_status};

/// Where a (student, event) pair stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceState {
    Unscanned,
    CheckedIn,
    CheckedOut,
    Absent,
}

pub fn classify(record: Option<&AttendanceRecord>) -> AttendanceState {
    match record {
        None => AttendanceState::Unscanned,
        Some(r) if r.status == CheckInStatus::Absent => AttendanceState::Absent,
        Some(r) if r.time_out.is_some() => AttendanceState::CheckedOut,
        Some(_) => AttendanceState::CheckedIn,
    }
}

/// Result of one scan. `record` is the pair's record after the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    pub kind: ScanKind,
    pub record: AttendanceRecord,
}

/// Mutating view over the attendance collection.
///
/// Users and events are borrowed read-only; only attendance changes.
pub struct Ledger<'a> {
    users: &'a [User],
    events: &'a [Event],
    attendance: &'a mut Vec<AttendanceRecord>,
    changed: bool,
}

impl<'a> Ledger<'a> {
    pub fn new(
        users: &'a [User],
        events: &'a [Event],
        attendance: &'a mut Vec<AttendanceRecord>,
    ) -> Self {
        Self {
            users,
            events,
            attendance,
            changed: false,
        }
    }

    /// Whether any call so far modified the attendance collection.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Apply one decoded QR code to `event_id` at time `at`.
    ///
    /// Unknown students and events leave the collection untouched.
    pub fn scan(
        &mut self,
        code: &str,
        event_id: u64,
        at: NaiveDateTime,
    ) -> Result<Scan, AttendanceError> {
        let code = code.trim();
        let users = self.users;
        let student = users
            .iter()
            .find(|u| u.is_student() && u.student_id.as_deref() == Some(code))
            .ok_or_else(|| AttendanceError::StudentNotFound(code.to_string()))?;
        let event = self.event(event_id)?;
        let (start_minutes, end_minutes) = schedule_minutes(event)?;

        let scan_minutes = minutes_of_day(&at);
        let stamp = format_clock(&at);

        let Some(idx) = self.position(student.id, event_id) else {
            let status = time_in_status(scan_minutes, start_minutes);
            let record = AttendanceRecord {
                id: self.next_id(),
                user_id: student.id,
                event_id,
                time_in: Some(stamp),
                time_out: None,
                status,
                time_out_status: None,
                final_status: status.into(),
            };
            self.attendance.push(record.clone());
            self.changed = true;
            return Ok(Scan {
                kind: ScanKind::CheckedIn,
                record,
            });
        };

        let record = &mut self.attendance[idx];
        let kind = match classify(Some(&*record)) {
            AttendanceState::Absent => ScanKind::MarkedAbsent,
            AttendanceState::CheckedOut => ScanKind::AlreadyCompleted,
            AttendanceState::CheckedIn | AttendanceState::Unscanned => {
                let out = time_out_status(scan_minutes, end_minutes);
                record.time_out = Some(stamp);
                record.time_out_status = Some(out);
                record.final_status = final_status(record.status, Some(out));
                self.changed = true;
                ScanKind::CheckedOut
            }
        };

        Ok(Scan {
            kind,
            record: record.clone(),
        })
    }

    /// Give every student without a record for `event_id` an Absent record.
    /// Returns how many were created; a second run creates none.
    pub fn mark_absent(&mut self, event_id: u64) -> Result<usize, AttendanceError> {
        self.event(event_id)?;

        let users = self.users;
        let mut created = 0;
        for student in users.iter().filter(|u| u.is_student()) {
            if self.position(student.id, event_id).is_some() {
                continue;
            }
            let record = AttendanceRecord {
                id: self.next_id(),
                user_id: student.id,
                event_id,
                time_in: None,
                time_out: None,
                status: CheckInStatus::Absent,
                time_out_status: None,
                final_status: FinalStatus::Absent,
            };
            self.attendance.push(record);
            self.changed = true;
            created += 1;
        }

        Ok(created)
    }

    /// Manual correction. Times are re-evaluated against the event unless an
    /// explicit status is given. An empty string clears a time.
    pub fn amend(
        &mut self,
        record_id: u64,
        patch: &AttendancePatch,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let events = self.events;
        let record = self
            .attendance
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or(AttendanceError::RecordNotFound(record_id))?;
        let event = events
            .iter()
            .find(|e| e.id == record.event_id)
            .ok_or(AttendanceError::EventNotFound(record.event_id))?;
        let (start_minutes, end_minutes) = schedule_minutes(event)?;

        // Parse everything before touching the record.
        let time_in = patch.time_in.as_deref().map(parse_optional).transpose()?;
        let time_out = patch.time_out.as_deref().map(parse_optional).transpose()?;

        if let Some(time_in) = time_in {
            record.time_in = time_in.as_ref().map(format_clock);
            if let (Some(t), None) = (time_in, patch.status) {
                record.status = time_in_status(minutes_of_day(&t), start_minutes);
            }
        }
        if let Some(time_out) = time_out {
            record.time_out = time_out.as_ref().map(format_clock);
            record.time_out_status = time_out.map(|t| time_out_status(minutes_of_day(&t), end_minutes));
        }
        if let Some(status) = patch.status {
            record.status = status;
        }
        record.final_status = final_status(record.status, record.time_out_status);
        let amended = record.clone();
        self.changed = true;

        Ok(amended)
    }

    pub fn remove(&mut self, record_id: u64) -> Result<AttendanceRecord, AttendanceError> {
        let idx = self
            .attendance
            .iter()
            .position(|r| r.id == record_id)
            .ok_or(AttendanceError::RecordNotFound(record_id))?;
        self.changed = true;
        Ok(self.attendance.remove(idx))
    }

    fn event(&self, event_id: u64) -> Result<&'a Event, AttendanceError> {
        let events: &'a [Event] = self.events;
        events
            .iter()
            .find(|e| e.id == event_id)
            .ok_or(AttendanceError::EventNotFound(event_id))
    }

    fn position(&self, user_id: u64, event_id: u64) -> Option<usize> {
        self.attendance
            .iter()
            .position(|r| r.user_id == user_id && r.event_id == event_id)
    }

    fn next_id(&self) -> u64 {
        self.attendance.iter().map(|r| r.id).max().map_or(1, |max| max + 1)
    }
}

fn schedule_minutes(event: &Event) -> Result<(u32, u32), AttendanceError> {
    Schedule::times_of(event).map_err(|e| AttendanceError::InvalidSchedule {
        event_id: event.id,
        reason: e.to_string(),
    })
}

fn parse_optional(raw: &str) -> Result<Option<NaiveTime>, AttendanceError> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse_wall_clock(raw).map(Some)
    }
}
