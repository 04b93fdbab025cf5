use axum::{Json, extract::State, response::IntoResponse};

use rollcall_types::api::{DashboardResponse, EventAttendanceCount};
use rollcall_types::models::AccountStatus;

use crate::auth::AppState;
use crate::error::ApiError;

/// Counters and chart series for the admin landing page.
pub async fn summary(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let summary = state.store.read(|data| {
        let students: Vec<_> = data.users().iter().filter(|u| u.is_student()).collect();
        let count_status = |status: AccountStatus| {
            data.users().iter().filter(|u| u.status == status).count()
        };

        DashboardResponse {
            total_students: students.len(),
            pending_students: students
                .iter()
                .filter(|u| u.status == AccountStatus::Pending)
                .count(),
            verified_students: students
                .iter()
                .filter(|u| u.status == AccountStatus::Verified)
                .count(),
            total_events: data.events().len(),
            total_attendance: data.attendance().len(),
            attendance_per_event: data
                .events()
                .iter()
                .map(|e| EventAttendanceCount {
                    event_id: e.id,
                    name: e.name.clone(),
                    count: data.attendance_for_event(e.id).len(),
                })
                .collect(),
            verified_users: count_status(AccountStatus::Verified),
            pending_users: count_status(AccountStatus::Pending),
        }
    })?;

    Ok(Json(summary))
}
