use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::fare;
use crate::engine::otp::four_digit_code;
use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus, PaymentMethod};
use crate::models::event::RealtimeEvent;
use crate::models::place::Place;
use crate::models::user::{Identity, Role};
use crate::models::vehicle::VehicleType;
use crate::observability::metrics::Metrics;
use crate::realtime::EventPublisher;
use crate::store::bookings::BookingStore;
use crate::store::users::UserDirectory;
use crate::store::vehicles::VehicleCatalog;

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub pickup: Option<Place>,
    pub delivery: Option<Place>,
    pub vehicle_type: VehicleType,
    pub payment_method: PaymentMethod,
}

/// Drives bookings through `pending → accepted → in_progress → completed`,
/// with cancellation allowed from `pending` and `accepted`.
///
/// Each transition is one conditional update on the [`BookingStore`]; the
/// event is published only after the update has committed.
pub struct BookingLifecycle {
    bookings: Arc<BookingStore>,
    users: Arc<UserDirectory>,
    vehicles: Arc<VehicleCatalog>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Metrics,
}

impl BookingLifecycle {
    pub fn new(
        bookings: Arc<BookingStore>,
        users: Arc<UserDirectory>,
        vehicles: Arc<VehicleCatalog>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Metrics,
    ) -> Self {
        Self {
            bookings,
            users,
            vehicles,
            publisher,
            metrics,
        }
    }

    pub fn create(&self, customer_id: Uuid, request: NewBooking) -> Result<Booking, AppError> {
        let customer = self
            .users
            .get(customer_id)
            .ok_or_else(|| AppError::NotFound(format!("user {customer_id} not found")))?;

        let pickup = validate_place("pickup", request.pickup)?;
        let delivery = validate_place("delivery", request.delivery)?;
        let pricing = self.vehicles.active(request.vehicle_type)?;
        let quote = fare::quote(&pickup.point(), &delivery.point(), &pricing);

        let booking = Booking {
            id: Uuid::new_v4(),
            customer_id,
            customer_name: customer.name,
            customer_phone: customer.phone,
            driver_id: None,
            driver_name: None,
            driver_phone: None,
            driver_vehicle_number: None,
            pickup,
            delivery,
            vehicle_type: request.vehicle_type,
            distance_km: quote.distance_km,
            base_price: quote.base_price,
            distance_charge: quote.distance_charge,
            total_price: quote.total_price,
            estimated_time_minutes: quote.estimated_time_minutes,
            payment_method: request.payment_method,
            status: BookingStatus::Pending,
            otp: four_digit_code(),
            rating: None,
            rating_comment: None,
            cancel_reason: None,
            created_at: Utc::now(),
            accepted_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
        };

        self.bookings.insert(booking.clone());
        self.metrics.record_transition("created");
        info!(
            booking_id = %booking.id,
            customer_id = %customer_id,
            vehicle_type = %booking.vehicle_type,
            total_price = booking.total_price,
            "booking created"
        );

        self.publisher
            .publish(RealtimeEvent::BookingNew(Box::new(booking.clone())));
        Ok(booking)
    }

    pub fn get(&self, booking_id: Uuid) -> Result<Booking, AppError> {
        self.bookings
            .get(booking_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))
    }

    /// Customers see their own bookings, drivers the ones assigned to them,
    /// admins everything.
    pub fn list_for(&self, caller: Identity) -> Vec<Booking> {
        match caller.role {
            Role::Customer => self.bookings.by_customer(caller.user_id),
            Role::Driver => self.bookings.by_driver(caller.user_id),
            Role::Admin => self.bookings.all(),
        }
    }

    pub fn accept(&self, booking_id: Uuid, driver_id: Uuid) -> Result<Booking, AppError> {
        let driver = self
            .users
            .get(driver_id)
            .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

        let result = self.bookings.compare_and_set(
            booking_id,
            &[BookingStatus::Pending],
            BookingStatus::Accepted,
            |booking| {
                booking.driver_id = Some(driver.id);
                booking.driver_name = Some(driver.name.clone());
                booking.driver_phone = Some(driver.phone.clone());
                booking.driver_vehicle_number = driver.vehicle_number.clone();
                booking.accepted_at = Some(Utc::now());
                Ok(())
            },
        );

        match result {
            Ok(booking) => {
                info!(booking_id = %booking_id, driver_id = %driver_id, "booking accepted");
                Ok(self.committed("accepted", booking))
            }
            Err(err @ AppError::Conflict(_)) => {
                self.metrics.accept_conflicts_total.inc();
                info!(
                    booking_id = %booking_id,
                    driver_id = %driver_id,
                    "accept lost: booking no longer pending"
                );
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// The submitted code is compared with the one fixed at creation. A
    /// mismatch changes nothing, so the driver may try again.
    pub fn start_trip(
        &self,
        booking_id: Uuid,
        driver_id: Uuid,
        code: &str,
    ) -> Result<Booking, AppError> {
        let booking = self.bookings.compare_and_set(
            booking_id,
            &[BookingStatus::Accepted],
            BookingStatus::InProgress,
            |booking| {
                ensure_assigned(booking, driver_id)?;
                if booking.otp != code.trim() {
                    warn!(booking_id = %booking_id, driver_id = %driver_id, "trip code mismatch");
                    return Err(AppError::InvalidCode);
                }
                booking.started_at = Some(Utc::now());
                Ok(())
            },
        )?;

        info!(booking_id = %booking_id, driver_id = %driver_id, "trip started");
        Ok(self.committed("started", booking))
    }

    pub fn complete_trip(&self, booking_id: Uuid, driver_id: Uuid) -> Result<Booking, AppError> {
        let booking = self.bookings.compare_and_set(
            booking_id,
            &[BookingStatus::InProgress],
            BookingStatus::Completed,
            |booking| {
                ensure_assigned(booking, driver_id)?;
                booking.completed_at = Some(Utc::now());
                Ok(())
            },
        )?;

        // Keyed by booking id, so a repeated credit cannot double count.
        match self.users.credit_trip(driver_id, booking.id, booking.total_price) {
            Ok(_) => {}
            Err(err) => error!(
                booking_id = %booking_id,
                driver_id = %driver_id,
                error = %err,
                "failed to credit completed trip"
            ),
        }

        info!(
            booking_id = %booking_id,
            driver_id = %driver_id,
            total_price = booking.total_price,
            "trip completed"
        );
        Ok(self.committed("completed", booking))
    }

    pub fn cancel(
        &self,
        booking_id: Uuid,
        caller: Identity,
        reason: Option<String>,
    ) -> Result<Booking, AppError> {
        let reason = reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty());

        let booking = self.bookings.compare_and_set(
            booking_id,
            &[BookingStatus::Pending, BookingStatus::Accepted],
            BookingStatus::Cancelled,
            |booking| {
                let allowed = match caller.role {
                    Role::Admin => true,
                    Role::Customer => booking.customer_id == caller.user_id,
                    Role::Driver => booking.is_assigned_to(caller.user_id),
                };
                if !allowed {
                    return Err(AppError::Forbidden(
                        "only the customer, the assigned driver or an admin may cancel".to_string(),
                    ));
                }
                booking.cancel_reason = reason;
                booking.cancelled_at = Some(Utc::now());
                Ok(())
            },
        )?;

        info!(
            booking_id = %booking_id,
            caller_id = %caller.user_id,
            reason = booking.cancel_reason.as_deref().unwrap_or(""),
            "booking cancelled"
        );
        Ok(self.committed("cancelled", booking))
    }

    /// Stores a 1..=5 rating. Does not change the status.
    pub fn rate(
        &self,
        booking_id: Uuid,
        customer_id: Uuid,
        rating: i64,
        comment: Option<String>,
    ) -> Result<Booking, AppError> {
        let rating = u8::try_from(rating)
            .ok()
            .filter(|rating| (1..=5).contains(rating))
            .ok_or_else(|| {
                AppError::InvalidInput("rating must be an integer from 1 to 5".to_string())
            })?;

        let booking = self.bookings.update_if(booking_id, |booking| {
            if booking.customer_id != customer_id {
                return Err(AppError::Forbidden(
                    "only the booking's customer may rate it".to_string(),
                ));
            }
            booking.rating = Some(rating);
            booking.rating_comment = comment;
            Ok(())
        })?;

        info!(booking_id = %booking_id, rating, "booking rated");
        Ok(self.committed("rated", booking))
    }

    fn committed(&self, transition: &str, booking: Booking) -> Booking {
        self.metrics.record_transition(transition);
        self.publisher
            .publish(RealtimeEvent::BookingUpdated(Box::new(booking.clone())));
        booking
    }
}

fn ensure_assigned(booking: &Booking, driver_id: Uuid) -> Result<(), AppError> {
    if booking.is_assigned_to(driver_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "booking is assigned to another driver".to_string(),
        ))
    }
}

fn validate_place(field: &str, place: Option<Place>) -> Result<Place, AppError> {
    let place = place.ok_or_else(|| AppError::InvalidInput(format!("{field} is required")))?;

    if !place.point().is_valid() {
        return Err(AppError::InvalidInput(format!(
            "{field} coordinates are out of range"
        )));
    }

    Ok(place)
}
