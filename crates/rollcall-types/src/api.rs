use serde::{Deserialize, Serialize};

use crate::models::{
    AccountStatus, AttendanceRecord, CheckInStatus, Event, EventStatus, FinalStatus, Role, User,
};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the scanner socket handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: u64,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

// -- Generic --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub id: u64,
    pub name: String,
    pub username: String,
    pub role: Role,
    pub token: String,
}

// -- Users --

/// A user as the API shows it. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: u64,
    pub student_id: Option<String>,
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            student_id: user.student_id.clone(),
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            status: user.status,
            position: user.position.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyRequest {
    pub id: u64,
}

// -- Events --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
}

/// An event plus its clock-derived status (`null` when the schedule is malformed).
#[derive(Debug, Serialize, Deserialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    pub status: Option<EventStatus>,
}

// -- Attendance --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceQuery {
    pub event_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanRequest {
    pub code: String,
}

/// What a scan did to the (student, event) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanKind {
    CheckedIn,
    CheckedOut,
    AlreadyCompleted,
    MarkedAbsent,
}

impl ScanKind {
    pub fn message(&self) -> &'static str {
        match self {
            ScanKind::CheckedIn => "Time in recorded.",
            ScanKind::CheckedOut => "Time out recorded.",
            ScanKind::AlreadyCompleted => "Attendance already completed.",
            ScanKind::MarkedAbsent => "Student was already marked absent.",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    pub outcome: ScanKind,
    pub message: String,
    pub record: AttendanceRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAbsentResponse {
    pub created: usize,
}

/// Manual correction of a record by an admin.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AttendancePatch {
    pub time_in: Option<String>,
    pub time_out: Option<String>,
    pub status: Option<CheckInStatus>,
}

/// A student's own attendance, joined with the event name.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyAttendanceEntry {
    pub event_id: u64,
    pub event_name: String,
    pub date: String,
    pub time_in: Option<String>,
    pub time_out: Option<String>,
    pub final_status: FinalStatus,
}

// -- Reports --

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub record_id: u64,
    pub student_id: String,
    pub name: String,
    pub time_in: Option<String>,
    pub time_out: Option<String>,
    pub status: FinalStatus,
}

// -- Dashboard --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttendanceCount {
    pub event_id: u64,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_students: usize,
    pub pending_students: usize,
    pub verified_students: usize,
    pub total_events: usize,
    pub total_attendance: usize,
    pub attendance_per_event: Vec<EventAttendanceCount>,
    pub verified_users: usize,
    pub pending_users: usize,
}
