use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use rollcall_attendance::AttendanceError;
use rollcall_types::api::MessageResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    /// Duplicate username or email. Reported as 400, like the signup form expects.
    #[error("{0}")]
    Conflict(String),

    #[error("Invalid username or password!")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Attendance(#[from] AttendanceError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Attendance(e) => match e {
                AttendanceError::StudentNotFound(_)
                | AttendanceError::EventNotFound(_)
                | AttendanceError::RecordNotFound(_) => StatusCode::NOT_FOUND,
                AttendanceError::InvalidTime(_)
                | AttendanceError::InvalidDate(_)
                | AttendanceError::InvalidSchedule { .. } => StatusCode::BAD_REQUEST,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            ApiError::Attendance(AttendanceError::StudentNotFound(_)) => {
                "Student not found!".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(MessageResponse::new(message))).into_response()
    }
}
