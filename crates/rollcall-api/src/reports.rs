use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use tracing::info;

use rollcall_store::Dataset;
use rollcall_types::api::{ReportQuery, ReportRow};

use crate::auth::AppState;
use crate::error::ApiError;

const CSV_HEADER: [&str; 5] = ["Student ID", "Name", "Time In", "Time Out", "Status"];

/// Report rows for an event, optionally narrowed by a case-insensitive
/// keyword over student name and id. Records whose user is gone are skipped.
pub fn report_rows(data: &Dataset, event_id: u64, search: &str) -> Vec<ReportRow> {
    let keyword = search.trim().to_lowercase();

    data.attendance_for_event(event_id)
        .into_iter()
        .filter_map(|record| {
            let student = data.user(record.user_id)?;
            let student_id = student.student_id.clone().unwrap_or_default();
            let matches = student.name.to_lowercase().contains(&keyword)
                || student_id.to_lowercase().contains(&keyword);
            matches.then(|| ReportRow {
                record_id: record.id,
                student_id,
                name: student.name.clone(),
                time_in: record.time_in.clone(),
                time_out: record.time_out.clone(),
                status: record.final_status,
            })
        })
        .collect()
}

/// CSV export of an event. `None` when the event has no records.
///
/// The status column is the time-in evaluation, matching the printed report.
pub fn render_csv(data: &Dataset, event_id: u64) -> Option<String> {
    let lines: Vec<String> = data
        .attendance_for_event(event_id)
        .into_iter()
        .map(|record| {
            let student = data.user(record.user_id);
            let fields = [
                student.and_then(|s| s.student_id.as_deref()).unwrap_or("-"),
                student.map(|s| s.name.as_str()).unwrap_or("-"),
                non_empty(record.time_in.as_deref()),
                non_empty(record.time_out.as_deref()),
                record.status.as_str(),
            ];
            csv_line(&fields)
        })
        .collect();

    if lines.is_empty() {
        return None;
    }

    let mut out = csv_line(&CSV_HEADER);
    for line in lines {
        out.push('\n');
        out.push_str(&line);
    }
    Some(out)
}

/// `Orientation Day 2025` -> `Orientation_Day_2025_attendance.csv`
pub fn csv_filename(event_name: &str) -> String {
    let stem: String = event_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| !matches!(c, '"' | '/' | '\\'))
        .collect();
    format!("{}_attendance.csv", stem)
}

fn non_empty(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "-",
    }
}

fn csv_line(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(event_id): Path<u64>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.store.read(|data| {
        data.event(event_id)
            .map(|_| report_rows(data, event_id, &query.search))
    })?;

    let rows = rows.ok_or_else(|| ApiError::NotFound("Event not found!".into()))?;
    Ok(Json(rows))
}

pub async fn export_csv(
    State(state): State<AppState>,
    Path(event_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let (name, csv) = state
        .store
        .read(|data| {
            data.event(event_id)
                .map(|event| (event.name.clone(), render_csv(data, event_id)))
        })?
        .ok_or_else(|| ApiError::NotFound("Event not found!".into()))?;

    let csv = csv.ok_or_else(|| {
        ApiError::NotFound("No attendance records found for this event!".into())
    })?;

    let filename = csv_filename(&name);
    info!("Exported {} for event {}", filename, event_id);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    ))
}
