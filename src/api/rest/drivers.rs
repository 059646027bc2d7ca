use std::sync::Arc;

use axum::extract::State;
use axum::routing::put;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::api::rest::extract::{AuthUser, ValidJson};
use crate::error::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers/online", put(update_online))
        .route("/drivers/location", put(update_location))
}

#[derive(Deserialize, Default)]
pub struct UpdateOnlineRequest {
    pub online: Option<bool>,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub lat: f64,
    pub lng: f64,
}

/// Sets the flag when `online` is given, toggles it otherwise.
async fn update_online(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    payload: Option<ValidJson<UpdateOnlineRequest>>,
) -> Result<Json<User>, AppError> {
    let caller = auth.require(&[Role::Driver])?;
    let payload = payload.map(|ValidJson(body)| body).unwrap_or_default();

    let driver = match payload.online {
        Some(online) => state.presence.set_online(caller.user_id, online)?,
        None => state.presence.toggle_online(caller.user_id)?,
    };
    Ok(Json(driver))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidJson(payload): ValidJson<UpdateLocationRequest>,
) -> Result<Json<User>, AppError> {
    let caller = auth.require(&[Role::Driver])?;
    let driver = state
        .presence
        .update_location(caller.user_id, payload.lat, payload.lng)?;
    Ok(Json(driver))
}
