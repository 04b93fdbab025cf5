use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Datelike, NaiveDateTime};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};

use rollcall_store::Store;
use rollcall_store::password::{hash_password, verify_password};
use rollcall_types::api::{Claims, LoginRequest, LoginResponse, MessageResponse, SignupRequest};
use rollcall_types::models::{AccountStatus, Role, User};

use crate::error::ApiError;
use crate::scanner::ScannerRegistry;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Store,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub scanners: ScannerRegistry,
    /// Wall clock used for scans, event status and student id years.
    pub now: fn() -> NaiveDateTime,
}

impl AppStateInner {
    pub fn new(store: Store, jwt_secret: String, token_ttl: chrono::Duration) -> Self {
        Self {
            store,
            jwt_secret,
            token_ttl,
            scanners: ScannerRegistry::new(),
            now: local_now,
        }
    }
}

pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.fullname.trim();
    let username = req.username.trim();
    let email = req.email.trim();
    if name.is_empty() || username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("All fields are required.".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let year = (state.now)().year();

    let user = state.store.write(|data| {
        if data.credentials_taken(username, email) {
            return Err(ApiError::Conflict("Username or email already exists!".into()));
        }

        let id = data.next_user_id();
        let user = User {
            id,
            student_id: Some(format!("{}-{:03}", year, id)),
            name: name.to_string(),
            username: username.to_string(),
            email: Some(email.to_string()),
            password: password_hash,
            role: Role::Student,
            status: AccountStatus::Pending,
            position: None,
        };
        data.users_mut().push(user.clone());
        Ok(user)
    })?;

    info!(
        "New student account '{}' ({}) pending verification",
        user.username,
        user.student_id.as_deref().unwrap_or("-")
    );

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Account created successfully!")),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .read(|data| data.user_by_username(req.username.trim()).cloned())?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password) {
        warn!("Failed login for '{}'", user.username);
        return Err(ApiError::InvalidCredentials);
    }

    let token = create_token(&state, &user)?;

    Ok(Json(LoginResponse {
        id: user.id,
        name: user.name,
        username: user.username,
        role: user.role,
        token,
    }))
}

pub fn create_token(state: &AppStateInner, user: &User) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role,
        exp: (chrono::Utc::now() + state.token_ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )?;

    Ok(token)
}
