use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::serde_ext::empty_as_none;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Pending,
    Verified,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

/// A row of `users.json`.
///
/// `password` holds an argon2 PHC string. Rows written by older deployments
/// may still carry plaintext here until the store upgrades them at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub student_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

impl User {
    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
}

/// Derived from the clock at read time, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
}

/// Time-in evaluation of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckInStatus {
    Present,
    Late,
    Absent,
}

/// Time-out evaluation of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckOutStatus {
    Present,
    #[serde(rename = "Early Out")]
    EarlyOut,
}

/// Summary outcome shown in logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalStatus {
    Present,
    Late,
    #[serde(rename = "Early Out")]
    EarlyOut,
    Absent,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInStatus::Present => "Present",
            CheckInStatus::Late => "Late",
            CheckInStatus::Absent => "Absent",
        }
    }
}

impl CheckOutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckOutStatus::Present => "Present",
            CheckOutStatus::EarlyOut => "Early Out",
        }
    }
}

impl FinalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalStatus::Present => "Present",
            FinalStatus::Late => "Late",
            FinalStatus::EarlyOut => "Early Out",
            FinalStatus::Absent => "Absent",
        }
    }
}

impl From<CheckInStatus> for FinalStatus {
    fn from(status: CheckInStatus) -> Self {
        match status {
            CheckInStatus::Present => FinalStatus::Present,
            CheckInStatus::Late => FinalStatus::Late,
            CheckInStatus::Absent => FinalStatus::Absent,
        }
    }
}

impl fmt::Display for CheckOutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckOutStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Present" => Ok(CheckOutStatus::Present),
            "Early Out" => Ok(CheckOutStatus::EarlyOut),
            other => Err(format!("unknown time-out status '{}'", other)),
        }
    }
}

/// A row of `attendance.json`. One per (user, event) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: u64,
    pub user_id: u64,
    pub event_id: u64,
    #[serde(default, with = "empty_as_none")]
    pub time_in: Option<String>,
    #[serde(default, with = "empty_as_none")]
    pub time_out: Option<String>,
    pub status: CheckInStatus,
    #[serde(default, with = "empty_as_none")]
    pub time_out_status: Option<CheckOutStatus>,
    pub final_status: FinalStatus,
}
