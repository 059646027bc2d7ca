use std::sync::Arc;

use axum::extract::State;
use axum::routing::put;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use tracing::info;

use crate::api::rest::extract::{AuthUser, ValidJson};
use crate::error::AppError;
use crate::models::user::{Role, User};
use crate::models::vehicle::VehicleType;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/users/profile", put(update_profile))
}

/// Absent fields are left as they are.
#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub vehicle_type: Option<String>,
    pub vehicle_number: Option<String>,
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidJson(payload): ValidJson<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    let caller = auth.0;

    let name = match payload.name.map(|name| name.trim().to_string()) {
        Some(name) if name.is_empty() => {
            return Err(AppError::InvalidInput("name cannot be empty".to_string()));
        }
        other => other,
    };

    let vehicle_type = payload
        .vehicle_type
        .map(|raw| raw.parse::<VehicleType>().map_err(AppError::InvalidVehicleType))
        .transpose()?;
    let vehicle_number = payload
        .vehicle_number
        .map(|plate| plate.trim().to_uppercase())
        .filter(|plate| !plate.is_empty());

    if caller.role != Role::Driver && (vehicle_type.is_some() || vehicle_number.is_some()) {
        return Err(AppError::Forbidden(
            "only drivers have vehicle details".to_string(),
        ));
    }

    let user = state.users.update(caller.user_id, |user| {
        if let Some(name) = name {
            user.name = name;
        }
        if vehicle_type.is_some() {
            user.vehicle_type = vehicle_type;
        }
        if vehicle_number.is_some() {
            user.vehicle_number = vehicle_number;
        }
    })?;

    info!(
        user_id = %user.id,
        vehicle_type = ?user.vehicle_type,
        "profile updated"
    );
    Ok(Json(user))
}
