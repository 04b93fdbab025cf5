use serde::{Deserialize, Serialize};

use crate::models::AttendanceRecord;

/// Commands sent by the admin's scanner client over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ScannerCommand {
    /// First message of every session: an admin JWT
    Identify { token: String },

    /// A decoded QR payload (the student's `studentId`)
    Scan { code: String },

    /// Operator pressed stop; the server releases the session
    Stop,
}

/// Events sent back to the scanner client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ScannerEvent {
    /// Handshake accepted, scans may follow
    Ready { event_id: u64, event_name: String },

    /// First scan: a record was created
    CheckedIn { record: AttendanceRecord },

    /// Second scan: the record's time out was filled
    CheckedOut { record: AttendanceRecord },

    /// Scan after check-out, nothing changed
    AlreadyCompleted { record: AttendanceRecord },

    /// The sweep already marked this student absent, nothing changed
    MarkedAbsent { record: AttendanceRecord },

    /// No student carries this code
    StudentNotFound { code: String },

    Error { message: String },

    /// The session ended (operator stop, superseded by another scanner, event deleted)
    Stopped { reason: String },
}
