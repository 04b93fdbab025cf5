use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{NaiveDate, NaiveDateTime};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use rollcall_api::{AppStateInner, router};
use rollcall_store::Store;
use rollcall_store::migrations::{AdminSeed, seed_admin};
use rollcall_types::api::{
    DashboardResponse, LoginResponse, MarkAbsentResponse, ReportRow, ScanKind, ScanResponse,
    UserView,
};
use rollcall_types::models::{AccountStatus, AttendanceRecord, FinalStatus, Role};

/// Friday morning, five minutes after the test event starts.
fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .and_then(|d| d.and_hms_opt(9, 5, 0))
        .expect("valid timestamp")
}

struct TestApp {
    app: Router,
    _dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        seed_admin(
            &store,
            &AdminSeed {
                username: "admin".into(),
                password: "admin-pass".into(),
                name: "Registrar".into(),
            },
        )
        .unwrap();

        let mut state = AppStateInner::new(store, "test-secret".into(), chrono::Duration::hours(1));
        state.now = fixed_now;

        Self {
            app: router(Arc::new(state)),
            _dir: dir,
        }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let (status, bytes) = self.send(req).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(&self, username: &str, password: &str) -> LoginResponse {
        let (status, body) = self
            .json(
                "POST",
                "/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        serde_json::from_value(body).unwrap()
    }

    async fn signup(&self, name: &str, username: &str) -> StatusCode {
        let (status, _) = self
            .json(
                "POST",
                "/signup",
                None,
                Some(json!({
                    "fullname": name,
                    "username": username,
                    "email": format!("{}@school.test", username),
                    "password": "secret",
                })),
            )
            .await;
        status
    }

    async fn create_event(&self, token: &str) -> u64 {
        let (status, body) = self
            .json(
                "POST",
                "/api/events",
                Some(token),
                Some(json!({
                    "name": "Foundation Day",
                    "date": "2025-03-14",
                    "startTime": "09:00",
                    "endTime": "11:00",
                    "place": "Gym",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        assert_eq!(body["status"], "Ongoing");
        body["id"].as_u64().unwrap()
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_signup_creates_pending_student() {
    let app = TestApp::new();
    assert_eq!(app.signup("Ana Reyes", "ana").await, StatusCode::CREATED);

    let admin = app.login("admin", "admin-pass").await;
    assert_eq!(admin.role, Role::Admin);

    let (status, body) = app
        .json("GET", "/api/users?role=student", Some(&admin.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let users: Vec<UserView> = serde_json::from_value(body).unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "ana");
    assert_eq!(users[0].student_id.as_deref(), Some("2025-002"));
    assert_eq!(users[0].status, AccountStatus::Pending);
}

#[tokio::test]
async fn test_signup_rejects_duplicates_and_blank_fields() {
    let app = TestApp::new();
    assert_eq!(app.signup("Ana Reyes", "ana").await, StatusCode::CREATED);
    assert_eq!(app.signup("Ana Again", "ana").await, StatusCode::BAD_REQUEST);
    assert_eq!(app.signup("  ", "someone").await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new();
    let (status, body) = app
        .json(
            "POST",
            "/login",
            None,
            Some(json!({ "username": "admin", "password": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid username or password!");
}

#[tokio::test]
async fn test_admin_routes_require_admin_token() {
    let app = TestApp::new();
    let (status, _) = app.json("GET", "/api/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.json("GET", "/api/events", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.signup("Ana Reyes", "ana").await;
    let student = app.login("ana", "secret").await;
    let (status, _) = app
        .json("GET", "/api/dashboard", Some(&student.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.json("GET", "/api/me", Some(&student.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ana");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_verify_user() {
    let app = TestApp::new();
    app.signup("Ana Reyes", "ana").await;
    let admin = app.login("admin", "admin-pass").await;

    let (status, body) = app
        .json("POST", "/api/users/verify", Some(&admin.token), Some(json!({ "id": 99 })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");

    let (status, _) = app
        .json("POST", "/api/users/verify", Some(&admin.token), Some(json!({ "id": 2 })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .json("GET", "/api/users?status=verified&role=student", Some(&admin.token), None)
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_event_validation() {
    let app = TestApp::new();
    let admin = app.login("admin", "admin-pass").await;
    let (status, _) = app
        .json(
            "POST",
            "/api/events",
            Some(&admin.token),
            Some(json!({
                "name": "Backwards",
                "date": "2025-03-14",
                "startTime": "11:00",
                "endTime": "09:00",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.json("GET", "/api/events/42", Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scan_lifecycle() {
    let app = TestApp::new();
    app.signup("Ana Reyes", "ana").await;
    let admin = app.login("admin", "admin-pass").await;
    let event_id = app.create_event(&admin.token).await;
    let uri = format!("/api/events/{}/scan", event_id);

    let (status, body) = app
        .json("POST", &uri, Some(&admin.token), Some(json!({ "code": "2025-002" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let first: ScanResponse = serde_json::from_value(body).unwrap();
    assert_eq!(first.outcome, ScanKind::CheckedIn);
    assert_eq!(first.record.time_in.as_deref(), Some("09:05 AM"));
    assert_eq!(first.record.final_status, FinalStatus::Late);

    let (_, body) = app
        .json("POST", &uri, Some(&admin.token), Some(json!({ "code": "2025-002" })))
        .await;
    let second: ScanResponse = serde_json::from_value(body).unwrap();
    assert_eq!(second.outcome, ScanKind::CheckedOut);
    assert_eq!(second.record.id, first.record.id);
    assert_eq!(second.record.final_status, FinalStatus::EarlyOut);

    let (status, body) = app
        .json("POST", &uri, Some(&admin.token), Some(json!({ "code": "2025-002" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let third: ScanResponse = serde_json::from_value(body).unwrap();
    assert_eq!(third.outcome, ScanKind::AlreadyCompleted);
    assert_eq!(third.record, second.record);

    let (status, body) = app
        .json("POST", &uri, Some(&admin.token), Some(json!({ "code": "1999-999" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Student not found!");

    let (_, body) = app
        .json(
            "GET",
            &format!("/api/attendance?eventId={}", event_id),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_mark_absent_is_idempotent() {
    let app = TestApp::new();
    app.signup("Ana Reyes", "ana").await;
    app.signup("Ben Cruz", "ben").await;
    let admin = app.login("admin", "admin-pass").await;
    let event_id = app.create_event(&admin.token).await;

    app.json(
        "POST",
        &format!("/api/events/{}/scan", event_id),
        Some(&admin.token),
        Some(json!({ "code": "2025-002" })),
    )
    .await;

    let uri = format!("/api/events/{}/mark-absent", event_id);
    let (status, body) = app.json("POST", &uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let first: MarkAbsentResponse = serde_json::from_value(body).unwrap();
    assert_eq!(first.created, 1);

    let (_, body) = app.json("POST", &uri, Some(&admin.token), None).await;
    let second: MarkAbsentResponse = serde_json::from_value(body).unwrap();
    assert_eq!(second.created, 0);

    // Absent students cannot scan in afterwards.
    let (_, body) = app
        .json(
            "POST",
            &format!("/api/events/{}/scan", event_id),
            Some(&admin.token),
            Some(json!({ "code": "2025-003" })),
        )
        .await;
    let scan: ScanResponse = serde_json::from_value(body).unwrap();
    assert_eq!(scan.outcome, ScanKind::MarkedAbsent);
    assert_eq!(scan.record.final_status, FinalStatus::Absent);
}

#[tokio::test]
async fn test_csv_export() {
    let app = TestApp::new();
    app.signup("Ana Reyes", "ana").await;
    let admin = app.login("admin", "admin-pass").await;
    let event_id = app.create_event(&admin.token).await;
    let csv_uri = format!("/api/reports/{}/csv", event_id);

    let (status, body) = app.json("GET", &csv_uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No attendance records found for this event!");

    app.json(
        "POST",
        &format!("/api/events/{}/scan", event_id),
        Some(&admin.token),
        Some(json!({ "code": "2025-002" })),
    )
    .await;

    let req = Request::builder()
        .uri(&csv_uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", admin.token))
        .body(Body::empty())
        .unwrap();
    let resp = app.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Student ID,Name,Time In,Time Out,Status"));
    assert_eq!(lines.next(), Some("2025-002,Ana Reyes,09:05 AM,-,Late"));

    let (status, _) = app
        .json("GET", "/api/reports/77/csv", Some(&admin.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_event_cascades() {
    let app = TestApp::new();
    app.signup("Ana Reyes", "ana").await;
    let admin = app.login("admin", "admin-pass").await;
    let event_id = app.create_event(&admin.token).await;
    app.json(
        "POST",
        &format!("/api/events/{}/mark-absent", event_id),
        Some(&admin.token),
        None,
    )
    .await;

    let (status, _) = app
        .json(
            "DELETE",
            &format!("/api/events/{}", event_id),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app.json("GET", "/api/attendance", Some(&admin.token), None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dashboard_counts() {
    let app = TestApp::new();
    app.signup("Ana Reyes", "ana").await;
    app.signup("Ben Cruz", "ben").await;
    let admin = app.login("admin", "admin-pass").await;
    app.json("POST", "/api/users/verify", Some(&admin.token), Some(json!({ "id": 2 })))
        .await;
    let event_id = app.create_event(&admin.token).await;
    app.json(
        "POST",
        &format!("/api/events/{}/mark-absent", event_id),
        Some(&admin.token),
        None,
    )
    .await;

    let (status, body) = app.json("GET", "/api/dashboard", Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let dash: DashboardResponse = serde_json::from_value(body).unwrap();
    assert_eq!(dash.total_students, 2);
    assert_eq!(dash.verified_students, 1);
    assert_eq!(dash.pending_students, 1);
    assert_eq!(dash.total_events, 1);
    assert_eq!(dash.total_attendance, 2);
    assert_eq!(dash.attendance_per_event.len(), 1);
    assert_eq!(dash.attendance_per_event[0].count, 2);
}

#[tokio::test]
async fn test_my_attendance() {
    let app = TestApp::new();
    app.signup("Ana Reyes", "ana").await;
    let admin = app.login("admin", "admin-pass").await;
    let event_id = app.create_event(&admin.token).await;
    app.json(
        "POST",
        &format!("/api/events/{}/scan", event_id),
        Some(&admin.token),
        Some(json!({ "code": "2025-002" })),
    )
    .await;

    let student = app.login("ana", "secret").await;
    let (status, body) = app
        .json("GET", "/api/me/attendance", Some(&student.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["eventName"], "Foundation Day");
    assert_eq!(body[0]["finalStatus"], "Late");
}

#[tokio::test]
async fn test_update_event() {
    let app = TestApp::new();
    let admin = app.login("admin", "admin-pass").await;
    let event_id = app.create_event(&admin.token).await;
    let uri = format!("/api/events/{}", event_id);

    let (status, body) = app
        .json(
            "PUT",
            &uri,
            Some(&admin.token),
            Some(json!({
                "name": "Foundation Day Rites",
                "date": "2025-03-14",
                "startTime": "08:00",
                "endTime": "09:00",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Foundation Day Rites");
    assert_eq!(body["status"], "Completed");
    assert!(body.get("place").is_none());

    let (status, _) = app
        .json(
            "PUT",
            &uri,
            Some(&admin.token),
            Some(json!({
                "name": "Foundation Day",
                "date": "2025-03-14",
                "startTime": "10:00",
                "endTime": "10:00",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(
            "PUT",
            "/api/events/404",
            Some(&admin.token),
            Some(json!({
                "name": "Ghost",
                "date": "2025-03-14",
                "startTime": "08:00",
                "endTime": "09:00",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.json("GET", &uri, Some(&admin.token), None).await;
    assert_eq!(body["name"], "Foundation Day Rites");
}

#[tokio::test]
async fn test_amend_and_delete_record() {
    let app = TestApp::new();
    app.signup("Ana Reyes", "ana").await;
    let admin = app.login("admin", "admin-pass").await;
    let event_id = app.create_event(&admin.token).await;
    let (_, body) = app
        .json(
            "POST",
            &format!("/api/events/{}/scan", event_id),
            Some(&admin.token),
            Some(json!({ "code": "2025-002" })),
        )
        .await;
    let scanned: ScanResponse = serde_json::from_value(body).unwrap();
    let uri = format!("/api/attendance/{}", scanned.record.id);

    // Corrected arrival time re-evaluates the time-in status.
    let (status, body) = app
        .json("PATCH", &uri, Some(&admin.token), Some(json!({ "timeIn": "08:55" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let amended: AttendanceRecord = serde_json::from_value(body).unwrap();
    assert_eq!(amended.time_in.as_deref(), Some("08:55 AM"));
    assert_eq!(amended.final_status, FinalStatus::Present);

    let (status, _) = app
        .json("PATCH", &uri, Some(&admin.token), Some(json!({ "timeOut": "whenever" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(
            "PATCH",
            "/api/attendance/999",
            Some(&admin.token),
            Some(json!({ "status": "Late" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.json("DELETE", &uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.json("DELETE", &uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.json("GET", "/api/attendance", Some(&admin.token), None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_report_search() {
    let app = TestApp::new();
    app.signup("Ana Reyes", "ana").await;
    app.signup("Ben Cruz", "ben").await;
    let admin = app.login("admin", "admin-pass").await;
    let event_id = app.create_event(&admin.token).await;
    for code in ["2025-002", "2025-003"] {
        app.json(
            "POST",
            &format!("/api/events/{}/scan", event_id),
            Some(&admin.token),
            Some(json!({ "code": code })),
        )
        .await;
    }

    let uri = format!("/api/reports/{}", event_id);
    let (status, body) = app.json("GET", &uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows: Vec<ReportRow> = serde_json::from_value(body).unwrap();
    assert_eq!(rows.len(), 2);

    let (_, body) = app
        .json("GET", &format!("{}?search=CRUZ", uri), Some(&admin.token), None)
        .await;
    let rows: Vec<ReportRow> = serde_json::from_value(body).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Ben Cruz");
    assert_eq!(rows[0].student_id, "2025-003");
    assert_eq!(rows[0].status, FinalStatus::Late);

    let (_, body) = app
        .json("GET", &format!("{}?search=2025-002", uri), Some(&admin.token), None)
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = app
        .json("GET", "/api/reports/31", Some(&admin.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Event not found!");
}
