use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDateTime;
use tracing::info;

use rollcall_attendance::clock::{Schedule, parse_date};
use rollcall_attendance::status::event_status;
use rollcall_types::api::{EventRequest, EventView};
use rollcall_types::models::Event;

use crate::auth::AppState;
use crate::error::ApiError;

pub fn view(event: &Event, now: NaiveDateTime) -> EventView {
    EventView {
        event: event.clone(),
        status: event_status(event, now).ok(),
    }
}

fn validate(req: &EventRequest) -> Result<(), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("Event name is required.".into()));
    }
    parse_date(&req.date)?;

    let probe = Event {
        id: 0,
        name: req.name.clone(),
        description: String::new(),
        date: req.date.clone(),
        start_time: req.start_time.clone(),
        end_time: req.end_time.clone(),
        place: None,
        poster: None,
    };
    let (start, end) = Schedule::times_of(&probe)?;
    if end <= start {
        return Err(ApiError::Validation("End time must be after start time.".into()));
    }
    Ok(())
}

fn apply(event: &mut Event, req: EventRequest) {
    event.name = req.name.trim().to_string();
    event.description = req.description.trim().to_string();
    event.date = req.date.trim().to_string();
    event.start_time = req.start_time.trim().to_string();
    event.end_time = req.end_time.trim().to_string();
    event.place = req.place.filter(|p| !p.trim().is_empty());
    event.poster = req.poster.filter(|p| !p.trim().is_empty());
}

pub async fn list_events(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let now = (state.now)();
    let events: Vec<EventView> = state
        .store
        .read(|data| data.events().iter().map(|e| view(e, now)).collect())?;

    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let now = (state.now)();
    let event = state
        .store
        .read(|data| data.event(id).map(|e| view(e, now)))?
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;

    Ok(Json(event))
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<EventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&req)?;

    let event = state.store.write(|data| {
        let mut event = Event {
            id: data.next_event_id(),
            name: String::new(),
            description: String::new(),
            date: String::new(),
            start_time: String::new(),
            end_time: String::new(),
            place: None,
            poster: None,
        };
        apply(&mut event, req);
        data.events_mut().push(event.clone());
        Ok::<_, ApiError>(event)
    })?;

    info!("Event {} '{}' created for {}", event.id, event.name, event.date);
    Ok((StatusCode::CREATED, Json(view(&event, (state.now)()))))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<EventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&req)?;

    let event = state.store.write(|data| {
        let event = data
            .events_mut()
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;
        apply(event, req);
        Ok::<_, ApiError>(event.clone())
    })?;

    info!("Event {} '{}' updated", event.id, event.name);
    Ok(Json(view(&event, (state.now)())))
}

/// Deleting an event also drops its attendance records and closes any
/// scanner session open on it.
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let (event, removed) = state.store.write(|data| {
        data.remove_event(id)
            .ok_or_else(|| ApiError::NotFound("Event not found".into()))
    })?;

    state.scanners.close(id);
    info!(
        "Event {} '{}' deleted with {} attendance records",
        event.id, event.name, removed
    );
    Ok(StatusCode::NO_CONTENT)
}
