use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::api::rest::extract::{parse_booking_id, AuthUser, ValidJson};
use crate::engine::dispatch;
use crate::engine::lifecycle::NewBooking;
use crate::error::AppError;
use crate::models::booking::{BookingView, PaymentMethod};
use crate::models::place::Place;
use crate::models::user::Role;
use crate::models::vehicle::VehicleType;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/pending", get(list_pending))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/accept", put(accept_booking))
        .route("/bookings/:id/start", put(start_trip))
        .route("/bookings/:id/complete", put(complete_trip))
        .route("/bookings/:id/cancel", put(cancel_booking))
        .route("/bookings/:id/rate", put(rate_booking))
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub pickup: Option<Place>,
    pub delivery: Option<Place>,
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

#[derive(Deserialize)]
pub struct StartTripRequest {
    pub otp: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidJson(payload): ValidJson<CreateBookingRequest>,
) -> Result<Json<BookingView>, AppError> {
    let caller = auth.require(&[Role::Customer])?;

    let vehicle_type = payload
        .vehicle_type
        .ok_or_else(|| AppError::InvalidInput("vehicle_type is required".to_string()))?
        .parse::<VehicleType>()
        .map_err(AppError::InvalidVehicleType)?;

    let booking = state.lifecycle.create(
        caller.user_id,
        NewBooking {
            pickup: payload.pickup,
            delivery: payload.delivery,
            vehicle_type,
            payment_method: payload.payment_method,
        },
    )?;

    Ok(Json(BookingView::for_caller(booking, caller)))
}

async fn list_bookings(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Json<Vec<BookingView>> {
    let bookings = state
        .lifecycle
        .list_for(auth.0)
        .into_iter()
        .map(|booking| BookingView::for_caller(booking, auth.0))
        .collect();
    Json(bookings)
}

async fn list_pending(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let caller = auth.require(&[Role::Driver])?;
    let bookings = dispatch::pending_for_driver(&state.bookings, &state.users, caller.user_id)?
        .into_iter()
        .map(|booking| BookingView::for_caller(booking, caller))
        .collect();
    Ok(Json(bookings))
}

async fn get_booking(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<BookingView>, AppError> {
    let booking = state.lifecycle.get(parse_booking_id(&id)?)?;
    Ok(Json(BookingView::for_caller(booking, auth.0)))
}

async fn accept_booking(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<BookingView>, AppError> {
    let caller = auth.require(&[Role::Driver])?;
    let booking = state
        .lifecycle
        .accept(parse_booking_id(&id)?, caller.user_id)?;
    Ok(Json(BookingView::for_caller(booking, caller)))
}

async fn start_trip(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<StartTripRequest>,
) -> Result<Json<BookingView>, AppError> {
    let caller = auth.require(&[Role::Driver])?;
    let code = payload
        .otp
        .filter(|code| !code.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("otp is required".to_string()))?;

    let booking = state
        .lifecycle
        .start_trip(parse_booking_id(&id)?, caller.user_id, &code)?;
    Ok(Json(BookingView::for_caller(booking, caller)))
}

async fn complete_trip(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<BookingView>, AppError> {
    let caller = auth.require(&[Role::Driver])?;
    let booking = state
        .lifecycle
        .complete_trip(parse_booking_id(&id)?, caller.user_id)?;
    Ok(Json(BookingView::for_caller(booking, caller)))
}

async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    payload: Option<ValidJson<CancelRequest>>,
) -> Result<Json<BookingView>, AppError> {
    let caller = auth.require(&[Role::Customer, Role::Driver, Role::Admin])?;
    let payload = payload.map(|ValidJson(body)| body).unwrap_or_default();

    let booking = state
        .lifecycle
        .cancel(parse_booking_id(&id)?, caller, payload.reason)?;
    Ok(Json(BookingView::for_caller(booking, caller)))
}

async fn rate_booking(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<RateRequest>,
) -> Result<Json<BookingView>, AppError> {
    let caller = auth.require(&[Role::Customer])?;
    let rating = payload
        .rating
        .ok_or_else(|| AppError::InvalidInput("rating is required".to_string()))?;

    let booking = state
        .lifecycle
        .rate(parse_booking_id(&id)?, caller.user_id, rating, payload.comment)?;
    Ok(Json(BookingView::for_caller(booking, caller)))
}
