use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::models::vehicle::VehiclePricing;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/vehicles", get(list_vehicles))
}

async fn list_vehicles(State(state): State<Arc<AppState>>) -> Json<Vec<VehiclePricing>> {
    Json(state.vehicles.list_active())
}
