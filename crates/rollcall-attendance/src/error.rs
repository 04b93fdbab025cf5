use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttendanceError {
    #[error("Student not found: {0}")]
    StudentNotFound(String),

    #[error("Event not found: {0}")]
    EventNotFound(u64),

    #[error("Attendance record not found: {0}")]
    RecordNotFound(u64),

    #[error("Invalid time '{0}'")]
    InvalidTime(String),

    #[error("Invalid date '{0}'")]
    InvalidDate(String),

    /// A stored event whose start or end time no longer parses.
    #[error("Event {event_id} has an unreadable schedule: {reason}")]
    InvalidSchedule { event_id: u64, reason: String },
}
