use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::rest::extract::{AuthUser, ValidJson};
use crate::error::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;

const MIN_PHONE_LEN: usize = 10;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/otp", post(send_otp))
        .route("/auth/verify", post(verify_otp))
        .route("/auth/me", get(me))
}

#[derive(Deserialize)]
pub struct SendOtpRequest {
    pub phone: Option<String>,
}

#[derive(Serialize)]
pub struct SendOtpResponse {
    pub phone: String,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub phone: Option<String>,
    pub otp: Option<String>,
    pub role: Option<Role>,
}

#[derive(Serialize)]
pub struct VerifyOtpResponse {
    pub token: Uuid,
    pub user: User,
    pub is_new: bool,
}

fn valid_phone(phone: Option<String>) -> Result<String, AppError> {
    phone
        .map(|phone| phone.trim().to_string())
        .filter(|phone| phone.len() >= MIN_PHONE_LEN)
        .ok_or_else(|| AppError::InvalidInput("valid phone number required".to_string()))
}

async fn send_otp(
    State(state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<SendOtpRequest>,
) -> Result<Json<SendOtpResponse>, AppError> {
    let phone = valid_phone(payload.phone)?;
    let issued = state.otp.issue(&phone);

    Ok(Json(SendOtpResponse {
        phone: issued.phone,
        expires_at: issued.expires_at,
        otp: state.expose_dev_otp.then_some(issued.code),
    }))
}

async fn verify_otp(
    State(state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, AppError> {
    let phone = valid_phone(payload.phone)?;
    let code = payload
        .otp
        .ok_or_else(|| AppError::InvalidInput("otp is required".to_string()))?;
    let role = payload.role.unwrap_or(Role::Customer);
    if role == Role::Admin {
        return Err(AppError::Forbidden(
            "admin accounts cannot be created by phone login".to_string(),
        ));
    }

    if !state.otp.verify(&phone, &code) {
        return Err(AppError::InvalidInput(
            "invalid or expired code, request a new one".to_string(),
        ));
    }

    let (user, is_new) = state.users.get_or_create_by_phone(&phone, role);
    let token = state.sessions.issue(user.identity());
    info!(user_id = %user.id, role = ?user.role, is_new, "user signed in");

    Ok(Json(VerifyOtpResponse { token, user, is_new }))
}

async fn me(State(state): State<Arc<AppState>>, auth: AuthUser) -> Result<Json<User>, AppError> {
    let user = state
        .users
        .get(auth.0.user_id)
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;
    Ok(Json(user))
}
