use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::vehicle::VehicleType;

/// Booking records keyed by id.
///
/// Every mutation goes through [`BookingStore::update_if`] or
/// [`BookingStore::compare_and_set`], which evaluate their precondition and
/// apply the change while holding the entry's write lock. The closure works
/// on a copy that is committed only when it returns `Ok`, so a rejected
/// mutation leaves the stored record untouched.
#[derive(Default)]
pub struct BookingStore {
    bookings: DashMap<Uuid, Booking>,
}

impl BookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, booking: Booking) {
        self.bookings.insert(booking.id, booking);
    }

    pub fn get(&self, id: Uuid) -> Option<Booking> {
        self.bookings.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    pub fn count_by_status(&self, status: BookingStatus) -> usize {
        self.bookings
            .iter()
            .filter(|entry| entry.value().status == status)
            .count()
    }

    /// Newest first.
    pub fn list_where<P>(&self, predicate: P) -> Vec<Booking>
    where
        P: Fn(&Booking) -> bool,
    {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings
    }

    pub fn by_customer(&self, customer_id: Uuid) -> Vec<Booking> {
        self.list_where(|booking| booking.customer_id == customer_id)
    }

    pub fn by_driver(&self, driver_id: Uuid) -> Vec<Booking> {
        self.list_where(|booking| booking.is_assigned_to(driver_id))
    }

    pub fn all(&self) -> Vec<Booking> {
        self.list_where(|_| true)
    }

    /// Pending bookings, oldest first, optionally restricted to one vehicle type.
    pub fn pending(&self, vehicle_type: Option<VehicleType>) -> Vec<Booking> {
        let mut bookings = self.list_where(|booking| {
            booking.status == BookingStatus::Pending
                && vehicle_type.is_none_or(|kind| booking.vehicle_type == kind)
        });
        bookings.reverse();
        bookings
    }

    /// Applies `apply` to the booking atomically. Returns the committed record.
    pub fn update_if<F>(&self, id: Uuid, apply: F) -> Result<Booking, AppError>
    where
        F: FnOnce(&mut Booking) -> Result<(), AppError>,
    {
        let mut entry = self
            .bookings
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))?;

        let mut draft = entry.value().clone();
        apply(&mut draft)?;
        *entry.value_mut() = draft.clone();

        Ok(draft)
    }

    /// Moves the booking to `next` only if its current status is one of
    /// `expected`. `apply` runs after the status check and may still reject.
    pub fn compare_and_set<F>(
        &self,
        id: Uuid,
        expected: &[BookingStatus],
        next: BookingStatus,
        apply: F,
    ) -> Result<Booking, AppError>
    where
        F: FnOnce(&mut Booking) -> Result<(), AppError>,
    {
        self.update_if(id, |booking| {
            let current = booking.status;
            if !expected.contains(&current) || !current.can_transition_to(next) {
                return Err(AppError::Conflict(format!(
                    "booking {id} is {}, cannot move to {}",
                    current.as_str(),
                    next.as_str()
                )));
            }

            apply(booking)?;
            booking.status = next;
            Ok(())
        })
    }
}
