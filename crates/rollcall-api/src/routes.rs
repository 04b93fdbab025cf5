use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use crate::auth::{self, AppState};
use crate::middleware::{require_admin, require_auth};
use crate::{attendance, dashboard, events, reports, scanner, users};

/// Every JSON route. Static pages are mounted by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/health", get(health));

    let student_routes = Router::new()
        .route("/api/me", get(users::me))
        .route("/api/me/attendance", get(attendance::my_attendance))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/api/users", get(users::list_users))
        .route("/api/users/verify", post(users::verify_user))
        .route("/api/events", get(events::list_events).post(events::create_event))
        .route(
            "/api/events/{id}",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/api/events/{id}/scan", post(attendance::scan))
        .route("/api/events/{id}/mark-absent", post(attendance::mark_absent))
        .route("/api/attendance", get(attendance::list_attendance))
        .route(
            "/api/attendance/{id}",
            patch(attendance::update_record).delete(attendance::delete_record),
        )
        .route("/api/reports/{event_id}", get(reports::get_report))
        .route("/api/reports/{event_id}/csv", get(reports::export_csv))
        .route("/api/dashboard", get(dashboard::summary))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Authenticates inside the socket handshake.
    let scanner_routes = Router::new().route("/api/events/{id}/scanner", get(scanner::scanner_ws));

    Router::new()
        .merge(public_routes)
        .merge(student_routes)
        .merge(admin_routes)
        .merge(scanner_routes)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
