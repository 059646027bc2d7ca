use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::Booking;
use crate::models::vehicle::VehicleType;
use crate::store::bookings::BookingStore;
use crate::store::users::UserDirectory;

/// Pending bookings open for acceptance. Vehicle type is the only filter;
/// driver location plays no part.
pub fn list_pending(bookings: &BookingStore, vehicle_type: Option<VehicleType>) -> Vec<Booking> {
    bookings.pending(vehicle_type)
}

/// The pool as seen by one driver: pending bookings for the driver's vehicle
/// type, or every pending booking when the driver has none on file.
pub fn pending_for_driver(
    bookings: &BookingStore,
    users: &UserDirectory,
    driver_id: Uuid,
) -> Result<Vec<Booking>, AppError> {
    let driver = users
        .get(driver_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

    Ok(list_pending(bookings, driver.vehicle_type))
}
