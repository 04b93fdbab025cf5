use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use rollcall_attendance::{AttendanceError, Scan};
use rollcall_types::api::{
    AttendancePatch, AttendanceQuery, Claims, MarkAbsentResponse, MyAttendanceEntry, ScanKind,
    ScanRequest, ScanResponse,
};
use rollcall_types::models::AttendanceRecord;

use crate::auth::{AppState, AppStateInner};
use crate::error::ApiError;

/// One scan as an atomic store transition. Shared by the HTTP endpoint and
/// the scanner socket.
pub fn apply_scan(state: &AppStateInner, event_id: u64, code: &str) -> Result<Scan, ApiError> {
    let now = (state.now)();
    let result = state
        .store
        .write(|data| data.ledger(|l| l.scan(code, event_id, now)).map_err(ApiError::from));

    match &result {
        Ok(scan) => match scan.kind {
            ScanKind::CheckedIn | ScanKind::CheckedOut => info!(
                "{:?}: user {} event {} -> {}",
                scan.kind,
                scan.record.user_id,
                event_id,
                scan.record.final_status.as_str()
            ),
            ScanKind::AlreadyCompleted | ScanKind::MarkedAbsent => warn!(
                "Rejected scan for user {} on event {}: {}",
                scan.record.user_id,
                event_id,
                scan.kind.message()
            ),
        },
        Err(ApiError::Attendance(AttendanceError::StudentNotFound(code))) => {
            warn!("Unknown student code '{}' scanned for event {}", code, event_id)
        }
        Err(_) => {}
    }

    result
}

pub async fn scan(
    State(state): State<AppState>,
    Path(event_id): Path<u64>,
    Json(req): Json<ScanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let scan = apply_scan(&state, event_id, &req.code)?;

    Ok(Json(ScanResponse {
        outcome: scan.kind,
        message: scan.kind.message().to_string(),
        record: scan.record,
    }))
}

pub async fn mark_absent(
    State(state): State<AppState>,
    Path(event_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .store
        .write(|data| data.ledger(|l| l.mark_absent(event_id)).map_err(ApiError::from))?;

    info!("Marked {} students absent for event {}", created, event_id);
    Ok(Json(MarkAbsentResponse { created }))
}

pub async fn list_attendance(
    State(state): State<AppState>,
    Query(query): Query<AttendanceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records: Vec<AttendanceRecord> = state.store.read(|data| match query.event_id {
        Some(event_id) => data
            .attendance_for_event(event_id)
            .into_iter()
            .cloned()
            .collect(),
        None => data.attendance().to_vec(),
    })?;

    Ok(Json(records))
}

pub async fn update_record(
    State(state): State<AppState>,
    Path(record_id): Path<u64>,
    Json(patch): Json<AttendancePatch>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .store
        .write(|data| data.ledger(|l| l.amend(record_id, &patch)).map_err(ApiError::from))?;

    info!(
        "Attendance record {} corrected -> {}",
        record.id,
        record.final_status.as_str()
    );
    Ok(Json(record))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path(record_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .store
        .write(|data| data.ledger(|l| l.remove(record_id)).map_err(ApiError::from))?;

    info!(
        "Attendance record {} (user {}, event {}) removed",
        record.id, record.user_id, record.event_id
    );
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's own attendance, newest event first.
pub async fn my_attendance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let mut entries: Vec<MyAttendanceEntry> = state.store.read(|data| {
        data.attendance_for_user(claims.sub)
            .into_iter()
            .filter_map(|record| {
                let event = data.event(record.event_id)?;
                Some(MyAttendanceEntry {
                    event_id: event.id,
                    event_name: event.name.clone(),
                    date: event.date.clone(),
                    time_in: record.time_in.clone(),
                    time_out: record.time_out.clone(),
                    final_status: record.final_status,
                })
            })
            .collect()
    })?;
    entries.sort_by(|a, b| b.date.cmp(&a.date));

    Ok(Json(entries))
}
