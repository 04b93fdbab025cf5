use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use tracing::info;

use rollcall_types::api::{Claims, MessageResponse, UserQuery, UserView, VerifyRequest};
use rollcall_types::models::AccountStatus;

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let users: Vec<UserView> = state.store.read(|data| {
        data.list_users(&query)
            .into_iter()
            .map(UserView::from)
            .collect()
    })?;

    Ok(Json(users))
}

/// Promote a pending account to verified. Verifying twice is harmless.
pub async fn verify_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = state.store.write(|data| {
        let user = data
            .users_mut()
            .iter_mut()
            .find(|u| u.id == req.id)
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
        user.status = AccountStatus::Verified;
        Ok::<_, ApiError>(user.username.clone())
    })?;

    info!("'{}' verified by '{}'", username, claims.username);
    Ok(Json(MessageResponse::new("User verified")))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .read(|data| data.user(claims.sub).map(UserView::from))?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(user))
}
