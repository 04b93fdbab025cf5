use rollcall_types::api::UserQuery;
use rollcall_types::models::{AttendanceRecord, Event, User};

use crate::Dataset;

impl Dataset {
    // -- Users --

    pub fn user(&self, id: u64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    /// True when either the username or the email already belongs to someone.
    pub fn credentials_taken(&self, username: &str, email: &str) -> bool {
        self.users
            .iter()
            .any(|u| u.username == username || u.email.as_deref() == Some(email))
    }

    pub fn next_user_id(&self) -> u64 {
        next_id(self.users.iter().map(|u| u.id))
    }

    /// Users matching every given filter. `search` is a case-insensitive
    /// substring over name, student id and role.
    pub fn list_users(&self, query: &UserQuery) -> Vec<&User> {
        let keyword = query.search.trim().to_lowercase();
        self.users
            .iter()
            .filter(|u| query.role.is_none_or(|role| u.role == role))
            .filter(|u| query.status.is_none_or(|status| u.status == status))
            .filter(|u| {
                let haystack = format!(
                    "{} {} {}",
                    u.name,
                    u.student_id.as_deref().unwrap_or(""),
                    u.role.as_str()
                );
                haystack.to_lowercase().contains(&keyword)
            })
            .collect()
    }

    // -- Events --

    pub fn event(&self, id: u64) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn next_event_id(&self) -> u64 {
        next_id(self.events.iter().map(|e| e.id))
    }

    /// Remove an event together with its attendance records.
    /// Returns the event and how many records went with it.
    pub fn remove_event(&mut self, id: u64) -> Option<(Event, usize)> {
        let idx = self.events.iter().position(|e| e.id == id)?;
        let event = self.events_mut().remove(idx);

        let before = self.attendance.len();
        self.attendance_mut().retain(|r| r.event_id != id);
        let removed = before - self.attendance.len();

        Some((event, removed))
    }

    // -- Attendance --

    pub fn attendance_for_event(&self, event_id: u64) -> Vec<&AttendanceRecord> {
        self.attendance
            .iter()
            .filter(|r| r.event_id == event_id)
            .collect()
    }

    pub fn attendance_for_user(&self, user_id: u64) -> Vec<&AttendanceRecord> {
        self.attendance
            .iter()
            .filter(|r| r.user_id == user_id)
            .collect()
    }
}

fn next_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().map_or(1, |max| max + 1)
}
